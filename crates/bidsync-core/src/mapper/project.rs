//! Projects and project-number derivation.

use chrono::NaiveDate;

use crate::error::AppError;
use crate::legacy::SourceProject;
use crate::models::Project;
use crate::status::SyncStatus;

use super::{clean, Mapping};

pub struct ProjectMapping;

impl Mapping for ProjectMapping {
    type Source = SourceProject;
    type Target = Project;

    /// The project number is not part of the field copy; see [`ProjectNumber`].
    fn to_insert(source: &SourceProject) -> Project {
        let mut project = Project {
            sync_pro_id: source.id,
            sync_status: SyncStatus::Unchanged,
            ..Default::default()
        };
        copy_project(source, &mut project);
        project
    }

    fn apply_update(source: &SourceProject, existing: &mut Project) {
        copy_project(source, existing);
    }
}

fn copy_project(src: &SourceProject, dst: &mut Project) {
    dst.arrival_date = src.arrival_date;
    dst.title = src.title.trim().to_string();
    dst.project_type = clean(&src.proj_type);
    dst.scope_of_work = clean(&src.scope);
    dst.loc_address = clean(&src.location_address);
    dst.loc_city = clean(&src.location_city);
    dst.loc_state = clean(&src.location_state);
    dst.loc_zip = clean(&src.location_zip);
    dst.owner_name = clean(&src.owner_name);
    dst.bid_date = src.bid_date;
    dst.bid_time = clean(&src.bid_time);
    dst.bid_location = clean(&src.bid_location);
    dst.bid_bond = clean(&src.bid_bond);
    dst.performance_bond = clean(&src.perf_bond);
    dst.payment_bond = clean(&src.payment_bond);
    dst.plans_available = src.plans_available;
    dst.plan_cost = clean(&src.plan_cost);
    dst.plan_deposit = clean(&src.plan_deposit);
    dst.deposit_refundable = src.deposit_refundable;
    dst.plans_location = clean(&src.plans_location);
    dst.specs_location = clean(&src.specs_location);
    dst.prevailing_wage = src.prevailing_wage;
    dst.davis_bacon = src.davis_bacon;
    dst.dbe_goal = clean(&src.dbe_goal);
    dst.set_aside = clean(&src.set_aside);
    dst.completion_days = src.completion_days;
    dst.completion_date = src.completion_date;
    dst.liquidated_damages = clean(&src.liquidated_damages);
    dst.contact_name = clean(&src.contact_name);
    dst.contact_phone = clean(&src.contact_phone);
    dst.contact_email = clean(&src.contact_email);
    dst.bid_results_posted = src.bid_results_posted;
    dst.award_date = src.award_date;
    dst.awarded_amount = clean(&src.awarded_amount);
    dst.notes = clean(&src.notes);
    dst.internal_notes = clean(&src.internal_notes);
    dst.is_active = src.is_active;
    dst.is_public = src.is_public;
}

/// A human-readable `YYMMnnnn` project number with its derived year and month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectNumber {
    pub number: String,
    /// Four-digit year, e.g. `"2024"`.
    pub year: String,
    /// Two-digit month, e.g. `"04"`.
    pub month: String,
}

impl ProjectNumber {
    /// Parses a number already assigned by the legacy system.
    ///
    /// The first four characters must be digits forming a `YYMM` prefix; the
    /// number itself is kept verbatim.
    pub fn from_explicit(raw: &str) -> Result<Self, AppError> {
        let number = raw.trim();
        let prefix = number
            .get(..4)
            .filter(|p| p.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| {
                AppError::InvalidData(format!("project number '{}' has no YYMM prefix", number))
            })?;

        let month = &prefix[2..4];
        if !matches!(month.parse::<u8>(), Ok(1..=12)) {
            return Err(AppError::InvalidData(format!(
                "project number '{}' has invalid month '{}'",
                number, month
            )));
        }

        Ok(Self {
            number: number.to_string(),
            year: format!("20{}", &prefix[..2]),
            month: month.to_string(),
        })
    }

    /// The `YYMM` prefix shared by projects that arrived in the same month.
    pub fn prefix_for(arrival: NaiveDate) -> String {
        arrival.format("%y%m").to_string()
    }

    /// Derives the next number for a month that already holds `existing` projects.
    ///
    /// # Examples
    ///
    /// ```
    /// use bidsync_core::mapper::ProjectNumber;
    /// use chrono::NaiveDate;
    ///
    /// let arrival = NaiveDate::from_ymd_opt(2024, 4, 18).unwrap();
    /// let number = ProjectNumber::sequenced(arrival, 6);
    /// assert_eq!(number.number, "24040007");
    /// assert_eq!(number.year, "2024");
    /// assert_eq!(number.month, "04");
    /// ```
    pub fn sequenced(arrival: NaiveDate, existing: i64) -> Self {
        Self {
            number: format!("{}{:04}", Self::prefix_for(arrival), existing + 1),
            year: arrival.format("%Y").to_string(),
            month: arrival.format("%m").to_string(),
        }
    }

    /// The explicit number carried by a source project, if any.
    pub fn explicit_in(source: &SourceProject) -> Result<Option<Self>, AppError> {
        match clean(&source.proj_number) {
            Some(raw) => Self::from_explicit(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Writes number, year and month onto a destination project.
    pub fn apply_to(&self, project: &mut Project) {
        project.proj_number = Some(self.number.clone());
        project.proj_year = Some(self.year.clone());
        project.proj_month = Some(self.month.clone());
    }

    /// Reads the number back from a persisted project.
    pub fn stored_in(project: &Project) -> Option<Self> {
        Some(Self {
            number: project.proj_number.clone()?,
            year: project.proj_year.clone()?,
            month: project.proj_month.clone()?,
        })
    }
}
