//! Field mapping from legacy source rows to destination records.
//!
//! Each entity kind exposes a pair of pure functions through [`Mapping`]:
//! `to_insert` builds a brand-new record and `apply_update` overwrites an
//! already-persisted one in place. Both go through the same private
//! field-copy function, so the mapped field set is identical by construction;
//! update is insert minus the key fields (destination id and back-reference).

pub mod addendum;
pub mod link;
pub mod party;
pub mod project;

pub use addendum::AddendumMapping;
pub use link::build_link;
pub use party::{
    address_for, apply_address, apply_profile, profile_for, ArchOwnerMapping, ContactMapping,
    ContractorMapping, MemberMapping,
};
pub use project::{ProjectMapping, ProjectNumber};

/// Source-to-destination mapping of one entity kind.
pub trait Mapping {
    type Source;
    type Target;

    /// Builds a new destination record with `sync_status = Unchanged` and the
    /// back-reference set to the source row id.
    fn to_insert(source: &Self::Source) -> Self::Target;

    /// Overwrites every mapped field of an existing record. The destination
    /// primary key and the back-reference are never touched.
    fn apply_update(source: &Self::Source, existing: &mut Self::Target);
}

/// Trims a free-text value and turns blanks into `None`.
pub(crate) fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Mapping;
    use std::fmt::Debug;

    /// Asserts that applying `changed` to a record inserted from `original`
    /// yields exactly what inserting `changed` would have produced.
    pub fn assert_update_matches_insert<M>(original: &M::Source, changed: &M::Source)
    where
        M: Mapping,
        M::Target: PartialEq + Debug,
    {
        let mut existing = M::to_insert(original);
        M::apply_update(changed, &mut existing);
        assert_eq!(existing, M::to_insert(changed));
    }
}
