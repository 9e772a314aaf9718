//! Rows read from the legacy source database.
//!
//! Every synchronizable table carries an integer `sync_status` column; the
//! source store only returns rows whose status is `New` or `Updated`.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::prelude::FromRow;

use crate::status::SyncStatus;

/// Common accessors the engine needs on every source row.
pub trait SourceRow {
    /// Primary key in the source table.
    fn source_id(&self) -> i64;
    /// Current status flag.
    fn sync_status(&self) -> SyncStatus;
}

macro_rules! source_row {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl SourceRow for $ty {
                fn source_id(&self) -> i64 {
                    self.id
                }

                fn sync_status(&self) -> SyncStatus {
                    self.sync_status
                }
            }
        )+
    };
}

source_row!(
    SourceMember,
    SourceContact,
    SourceContractor,
    SourceArchOwner,
    SourceProject,
    SourceProjectCounty,
    SourceAddendum,
    SourceProjectLink,
);

/// Postal address columns repeated on members, contractors and architects/owners.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct SourceAddress {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

impl SourceAddress {
    /// True when no address column is populated.
    pub fn is_blank(&self) -> bool {
        [
            &self.address1,
            &self.address2,
            &self.city,
            &self.state,
            &self.zip,
        ]
        .iter()
        .all(|v| v.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}

/// A row of the legacy `members` table.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct SourceMember {
    pub id: i64,
    pub company_name: String,
    pub dba_name: Option<String>,
    #[sqlx(flatten)]
    pub address: SourceAddress,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub member_type: Option<String>,
    pub is_active: bool,
    pub join_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// A row of the legacy `member_contacts` table.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct SourceContact {
    pub id: i64,
    pub member_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub is_primary: bool,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

impl SourceContact {
    /// Email/password pair for login creation, when both are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let email = self.email.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let password = self.password.as_deref().filter(|s| !s.is_empty())?;
        Some((email, password))
    }
}

/// A row of the legacy `contractors` table.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct SourceContractor {
    pub id: i64,
    pub name: String,
    #[sqlx(flatten)]
    pub address: SourceAddress,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub contact_name: Option<String>,
    pub license_number: Option<String>,
    pub trade: Option<String>,
    pub is_active: bool,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// A row of the legacy `arch_owners` table.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct SourceArchOwner {
    pub id: i64,
    pub name: String,
    /// "Architect", "Engineer" or "Owner" in practice.
    pub ao_type: Option<String>,
    #[sqlx(flatten)]
    pub address: SourceAddress,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub contact_name: Option<String>,
    pub is_active: bool,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// A row of the legacy `projects` table.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct SourceProject {
    pub id: i64,
    /// Human-readable `YYMMnnnn` number, when the legacy system already assigned one.
    pub proj_number: Option<String>,
    pub arrival_date: Option<NaiveDate>,
    pub title: String,
    pub proj_type: Option<String>,
    pub scope: Option<String>,
    pub location_address: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_zip: Option<String>,
    pub owner_name: Option<String>,
    pub bid_date: Option<NaiveDateTime>,
    pub bid_time: Option<String>,
    pub bid_location: Option<String>,
    pub bid_bond: Option<String>,
    pub perf_bond: Option<String>,
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
    pub pre_bid_date1: Option<NaiveDateTime>,
    pub pre_bid_loc1: Option<String>,
    pub pre_bid_mandatory1: bool,
    pub pre_bid_date2: Option<NaiveDateTime>,
    pub pre_bid_loc2: Option<String>,
    pub pre_bid_mandatory2: bool,
    pub est_cost1: Option<String>,
    pub est_cost2: Option<String>,
    pub est_cost3: Option<String>,
    pub est_cost4: Option<String>,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

impl SourceProject {
    /// Source columns whose change-log entries are stamped once the project syncs.
    pub const TRACKED_FIELDS: &'static [&'static str] = &[
        "proj_number",
        "title",
        "proj_type",
        "scope",
        "location_address",
        "location_city",
        "location_state",
        "location_zip",
        "owner_name",
        "bid_date",
        "bid_time",
        "bid_location",
        "plans_location",
        "specs_location",
        "completion_date",
        "award_date",
        "awarded_amount",
        "is_active",
        "is_public",
        "pre_bid_date1",
        "pre_bid_loc1",
        "pre_bid_date2",
        "pre_bid_loc2",
        "est_cost1",
        "est_cost2",
        "est_cost3",
        "est_cost4",
    ];

    /// True when at least one pre-bid date is populated.
    pub fn has_pre_bid(&self) -> bool {
        self.pre_bid_date1.is_some() || self.pre_bid_date2.is_some()
    }

    /// The four estimated-cost columns in display order.
    pub fn est_costs(&self) -> [Option<&str>; 4] {
        [
            self.est_cost1.as_deref(),
            self.est_cost2.as_deref(),
            self.est_cost3.as_deref(),
            self.est_cost4.as_deref(),
        ]
    }
}

/// A row of the legacy `project_counties` table, joined to the county name.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct SourceProjectCounty {
    pub id: i64,
    pub project_id: i64,
    pub county_name: String,
    pub state: String,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// A row of the legacy `addenda` table.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct SourceAddendum {
    pub id: i64,
    pub project_id: i64,
    pub addendum_number: i32,
    pub issue_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub page_count: Option<i32>,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}

/// Role a business entity plays on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum LinkRole {
    #[default]
    Contractor,
    ArchOwner,
}

impl LinkRole {
    /// Code stored in the destination `entities.entity_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            LinkRole::Contractor => "contractor",
            LinkRole::ArchOwner => "arch_owner",
        }
    }
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for LinkRole {
    type Error = crate::error::AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "contractor" => Ok(LinkRole::Contractor),
            "arch_owner" => Ok(LinkRole::ArchOwner),
            other => Err(crate::error::AppError::InvalidData(format!(
                "unknown link role '{}'",
                other
            ))),
        }
    }
}

/// A row of `project_contractors` or `project_arch_owners`.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct SourceProjectLink {
    pub id: i64,
    pub project_id: i64,
    /// Contractor id or architect/owner id, depending on `role`.
    pub party_id: i64,
    #[sqlx(try_from = "String")]
    pub role: LinkRole,
    #[sqlx(try_from = "i16")]
    pub sync_status: SyncStatus,
}
