//! Project addenda.

use crate::legacy::SourceAddendum;
use crate::models::Addendum;
use crate::status::SyncStatus;

use super::{clean, Mapping};

pub struct AddendumMapping;

impl Mapping for AddendumMapping {
    type Source = SourceAddendum;
    type Target = Addendum;

    /// The destination project id is resolved by the engine.
    fn to_insert(source: &SourceAddendum) -> Addendum {
        let mut addendum = Addendum {
            sync_addendum_id: source.id,
            sync_status: SyncStatus::Unchanged,
            ..Default::default()
        };
        copy_addendum(source, &mut addendum);
        addendum
    }

    fn apply_update(source: &SourceAddendum, existing: &mut Addendum) {
        copy_addendum(source, existing);
    }
}

fn copy_addendum(src: &SourceAddendum, dst: &mut Addendum) {
    dst.addendum_number = src.addendum_number;
    dst.issue_date = src.issue_date;
    dst.description = clean(&src.description);
    dst.page_count = src.page_count;
}
