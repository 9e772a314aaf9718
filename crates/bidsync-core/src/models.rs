//! Records of the destination application database.
//!
//! Every record carries its own `sync_status`, written as
//! [`SyncStatus::Unchanged`] on creation, and a back-reference to the source
//! row it was derived from.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::prelude::FromRow;

use crate::cost::RangeSign;
use crate::legacy::LinkRole;
use crate::status::SyncStatus;

/// Back-reference used to locate a business entity by its source provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartyKey {
    /// `old_mem_id`
    Member(i64),
    /// `old_con_id`
    Contractor(i64),
    /// `old_ao_id`
    ArchOwner(i64),
}

impl PartyKey {
    /// Back-reference key for the party side of a project link.
    pub fn for_link(role: LinkRole, party_id: i64) -> Self {
        match role {
            LinkRole::Contractor => PartyKey::Contractor(party_id),
            LinkRole::ArchOwner => PartyKey::ArchOwner(party_id),
        }
    }
}

/// Canonical party record unifying members, contractors and architects/owners.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct BusinessEntity {
    pub id: i64,
    pub name: String,
    pub dba_name: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub contact_name: Option<String>,
    pub license_number: Option<String>,
    pub trade: Option<String>,
    pub ao_type: Option<String>,
    pub is_member: bool,
    pub is_contractor: bool,
    pub is_architect: bool,
    pub is_active: bool,
    pub old_mem_id: Option<i64>,
    pub old_con_id: Option<i64>,
    pub old_ao_id: Option<i64>,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// The canonical address of a business entity.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct Address {
    pub id: i64,
    pub business_entity_id: i64,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// Membership details of a member business entity.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct MemberProfile {
    pub id: i64,
    pub business_entity_id: i64,
    pub member_type: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// A person attached to a member business entity.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct Contact {
    pub id: i64,
    pub business_entity_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub is_primary: bool,
    /// Identity-provider user id, once a login was provisioned.
    pub user_id: Option<String>,
    pub sync_contact_id: i64,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// A bid/construction project.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct Project {
    pub id: i64,
    pub sync_pro_id: i64,
    pub proj_number: Option<String>,
    pub proj_year: Option<String>,
    pub proj_month: Option<String>,
    pub arrival_date: Option<NaiveDate>,
    pub title: String,
    pub project_type: Option<String>,
    pub scope_of_work: Option<String>,
    pub loc_address: Option<String>,
    pub loc_city: Option<String>,
    pub loc_state: Option<String>,
    pub loc_zip: Option<String>,
    pub owner_name: Option<String>,
    pub bid_date: Option<NaiveDateTime>,
    pub bid_time: Option<String>,
    pub bid_location: Option<String>,
    pub bid_bond: Option<String>,
    pub performance_bond: Option<String>,
    pub payment_bond: Option<String>,
    pub plans_available: bool,
    pub plan_cost: Option<String>,
    pub plan_deposit: Option<String>,
    pub deposit_refundable: bool,
    pub plans_location: Option<String>,
    pub specs_location: Option<String>,
    pub prevailing_wage: bool,
    pub davis_bacon: bool,
    pub dbe_goal: Option<String>,
    pub set_aside: Option<String>,
    pub completion_days: Option<i32>,
    pub completion_date: Option<NaiveDate>,
    pub liquidated_damages: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub bid_results_posted: bool,
    pub award_date: Option<NaiveDate>,
    pub awarded_amount: Option<String>,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
    pub is_active: bool,
    pub is_public: bool,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// County assignment of a project.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct ProjCounty {
    pub id: i64,
    pub proj_id: i64,
    pub county_id: i64,
    pub sync_pro_county_id: i64,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// A pre-bid meeting of a project.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct PreBidInfo {
    pub id: i64,
    pub proj_id: i64,
    pub pre_bid_date: NaiveDateTime,
    pub location: Option<String>,
    pub is_mandatory: bool,
    pub sort_order: i16,
    pub sync_pro_id: i64,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// A structured estimated-cost range of a project.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct EstCostDetail {
    pub id: i64,
    pub proj_id: i64,
    pub cost_from: String,
    pub cost_to: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub range_sign: RangeSign,
    pub sort_order: i16,
    pub sync_pro_id: i64,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// An addendum issued for a project.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct Addendum {
    pub id: i64,
    pub proj_id: i64,
    pub addendum_number: i32,
    pub issue_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub page_count: Option<i32>,
    pub sync_addendum_id: i64,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// Link row tying a business entity to a project for a role.
///
/// `entity_name`, `is_active` and `proj_number` are snapshots taken when the
/// link was synchronized, not live joins.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct EntityLink {
    pub id: i64,
    pub proj_id: i64,
    pub business_entity_id: i64,
    #[sqlx(try_from = "String")]
    pub role: LinkRole,
    pub entity_name: String,
    pub is_active: bool,
    pub proj_number: Option<String>,
    pub sync_link_id: i64,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}
