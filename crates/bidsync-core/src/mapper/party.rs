//! Members, contacts, contractors and architects/owners.

use crate::legacy::{SourceAddress, SourceArchOwner, SourceContact, SourceContractor, SourceMember};
use crate::models::{Address, BusinessEntity, Contact, MemberProfile};
use crate::status::SyncStatus;

use super::{clean, Mapping};

pub struct MemberMapping;

impl Mapping for MemberMapping {
    type Source = SourceMember;
    type Target = BusinessEntity;

    fn to_insert(source: &SourceMember) -> BusinessEntity {
        let mut entity = BusinessEntity {
            old_mem_id: Some(source.id),
            sync_status: SyncStatus::Unchanged,
            ..Default::default()
        };
        copy_member(source, &mut entity);
        entity
    }

    fn apply_update(source: &SourceMember, existing: &mut BusinessEntity) {
        copy_member(source, existing);
    }
}

fn copy_member(src: &SourceMember, dst: &mut BusinessEntity) {
    dst.name = src.company_name.trim().to_string();
    dst.dba_name = clean(&src.dba_name);
    dst.phone = clean(&src.phone);
    dst.fax = clean(&src.fax);
    dst.email = clean(&src.email);
    dst.website = clean(&src.website);
    dst.is_member = true;
    dst.is_active = src.is_active;
}

pub struct ContractorMapping;

impl Mapping for ContractorMapping {
    type Source = SourceContractor;
    type Target = BusinessEntity;

    fn to_insert(source: &SourceContractor) -> BusinessEntity {
        let mut entity = BusinessEntity {
            old_con_id: Some(source.id),
            sync_status: SyncStatus::Unchanged,
            ..Default::default()
        };
        copy_contractor(source, &mut entity);
        entity
    }

    fn apply_update(source: &SourceContractor, existing: &mut BusinessEntity) {
        copy_contractor(source, existing);
    }
}

fn copy_contractor(src: &SourceContractor, dst: &mut BusinessEntity) {
    dst.name = src.name.trim().to_string();
    dst.phone = clean(&src.phone);
    dst.fax = clean(&src.fax);
    dst.email = clean(&src.email);
    dst.website = clean(&src.website);
    dst.contact_name = clean(&src.contact_name);
    dst.license_number = clean(&src.license_number);
    dst.trade = clean(&src.trade);
    dst.is_contractor = true;
    dst.is_active = src.is_active;
}

pub struct ArchOwnerMapping;

impl Mapping for ArchOwnerMapping {
    type Source = SourceArchOwner;
    type Target = BusinessEntity;

    fn to_insert(source: &SourceArchOwner) -> BusinessEntity {
        let mut entity = BusinessEntity {
            old_ao_id: Some(source.id),
            sync_status: SyncStatus::Unchanged,
            ..Default::default()
        };
        copy_arch_owner(source, &mut entity);
        entity
    }

    fn apply_update(source: &SourceArchOwner, existing: &mut BusinessEntity) {
        copy_arch_owner(source, existing);
    }
}

fn copy_arch_owner(src: &SourceArchOwner, dst: &mut BusinessEntity) {
    dst.name = src.name.trim().to_string();
    dst.ao_type = clean(&src.ao_type);
    dst.phone = clean(&src.phone);
    dst.fax = clean(&src.fax);
    dst.email = clean(&src.email);
    dst.website = clean(&src.website);
    dst.contact_name = clean(&src.contact_name);
    dst.is_architect = true;
    dst.is_active = src.is_active;
}

pub struct ContactMapping;

impl Mapping for ContactMapping {
    type Source = SourceContact;
    type Target = Contact;

    /// The owning business entity id is resolved by the engine.
    fn to_insert(source: &SourceContact) -> Contact {
        let mut contact = Contact {
            sync_contact_id: source.id,
            sync_status: SyncStatus::Unchanged,
            ..Default::default()
        };
        copy_contact(source, &mut contact);
        contact
    }

    fn apply_update(source: &SourceContact, existing: &mut Contact) {
        copy_contact(source, existing);
    }
}

fn copy_contact(src: &SourceContact, dst: &mut Contact) {
    dst.first_name = src.first_name.trim().to_string();
    dst.last_name = src.last_name.trim().to_string();
    dst.title = clean(&src.title);
    dst.email = clean(&src.email);
    dst.phone = clean(&src.phone);
    dst.mobile = clean(&src.mobile);
    dst.is_primary = src.is_primary;
}

/// Builds the canonical address of a business entity.
pub fn address_for(entity_id: i64, source: &SourceAddress) -> Address {
    let mut address = Address {
        business_entity_id: entity_id,
        sync_status: SyncStatus::Unchanged,
        ..Default::default()
    };
    apply_address(source, &mut address);
    address
}

/// Overwrites the mapped columns of an existing address.
pub fn apply_address(src: &SourceAddress, dst: &mut Address) {
    dst.line1 = clean(&src.address1);
    dst.line2 = clean(&src.address2);
    dst.city = clean(&src.city);
    dst.state = clean(&src.state);
    dst.zip = clean(&src.zip);
}

/// Builds the member profile of a member business entity.
pub fn profile_for(entity_id: i64, source: &SourceMember) -> MemberProfile {
    let mut profile = MemberProfile {
        business_entity_id: entity_id,
        sync_status: SyncStatus::Unchanged,
        ..Default::default()
    };
    apply_profile(source, &mut profile);
    profile
}

pub fn apply_profile(src: &SourceMember, dst: &mut MemberProfile) {
    dst.member_type = clean(&src.member_type);
    dst.join_date = src.join_date;
    dst.expiry_date = src.expiry_date;
    dst.notes = clean(&src.notes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::test_support::assert_update_matches_insert;
    use chrono::NaiveDate;

    fn member() -> SourceMember {
        SourceMember {
            id: 101,
            company_name: " Acme Paving ".to_string(),
            dba_name: Some("Acme".to_string()),
            address: SourceAddress {
                address1: Some("12 Main St".to_string()),
                city: Some("Conway".to_string()),
                state: Some("AR".to_string()),
                zip: Some("72032".to_string()),
                ..Default::default()
            },
            phone: Some("501-555-0100".to_string()),
            email: Some("bids@acme.test".to_string()),
            member_type: Some("General".to_string()),
            is_active: true,
            join_date: NaiveDate::from_ymd_opt(2019, 3, 1),
            sync_status: SyncStatus::New,
            ..Default::default()
        }
    }

    #[test]
    fn test_member_to_insert() {
        let entity = MemberMapping::to_insert(&member());
        assert_eq!(entity.id, 0);
        assert_eq!(entity.name, "Acme Paving");
        assert_eq!(entity.old_mem_id, Some(101));
        assert_eq!(entity.old_con_id, None);
        assert!(entity.is_member);
        assert!(!entity.is_contractor);
        assert_eq!(entity.sync_status, SyncStatus::Unchanged);
    }

    #[test]
    fn test_member_update_keeps_keys() {
        let mut existing = MemberMapping::to_insert(&member());
        existing.id = 55;
        let mut changed = member();
        changed.company_name = "Acme Paving & Grading".to_string();
        changed.email = None;
        MemberMapping::apply_update(&changed, &mut existing);

        assert_eq!(existing.id, 55);
        assert_eq!(existing.old_mem_id, Some(101));
        assert_eq!(existing.name, "Acme Paving & Grading");
        assert_eq!(existing.email, None);
    }

    #[test]
    fn test_update_field_lists_match_insert() {
        let mut changed = member();
        changed.company_name = "Other".to_string();
        changed.fax = Some("501-555-0199".to_string());
        changed.is_active = false;
        assert_update_matches_insert::<MemberMapping>(&member(), &changed);

        let contractor = SourceContractor {
            id: 7,
            name: "Delta Electric".to_string(),
            trade: Some("Electrical".to_string()),
            is_active: true,
            ..Default::default()
        };
        let changed = SourceContractor {
            license_number: Some("LIC-9".to_string()),
            contact_name: Some("Sam".to_string()),
            ..contractor.clone()
        };
        assert_update_matches_insert::<ContractorMapping>(&contractor, &changed);

        let ao = SourceArchOwner {
            id: 3,
            name: "City of Benton".to_string(),
            ao_type: Some("Owner".to_string()),
            ..Default::default()
        };
        let changed = SourceArchOwner {
            website: Some("benton.test".to_string()),
            is_active: true,
            ..ao.clone()
        };
        assert_update_matches_insert::<ArchOwnerMapping>(&ao, &changed);

        let contact = SourceContact {
            id: 9,
            member_id: 101,
            first_name: "Jo".to_string(),
            last_name: "Park".to_string(),
            ..Default::default()
        };
        let changed = SourceContact {
            title: Some("Estimator".to_string()),
            is_primary: true,
            ..contact.clone()
        };
        assert_update_matches_insert::<ContactMapping>(&contact, &changed);
    }

    #[test]
    fn test_arch_owner_flags() {
        let ao = SourceArchOwner {
            id: 3,
            name: "Smith Architects".to_string(),
            ..Default::default()
        };
        let entity = ArchOwnerMapping::to_insert(&ao);
        assert!(entity.is_architect);
        assert_eq!(entity.old_ao_id, Some(3));
    }

    #[test]
    fn test_address_and_profile() {
        let src = member();
        let address = address_for(55, &src.address);
        assert_eq!(address.business_entity_id, 55);
        assert_eq!(address.line1.as_deref(), Some("12 Main St"));
        assert_eq!(address.line2, None);

        let profile = profile_for(55, &src);
        assert_eq!(profile.member_type.as_deref(), Some("General"));
        assert_eq!(profile.join_date, NaiveDate::from_ymd_opt(2019, 3, 1));
    }
}
