//! Dependency resolver for project child collections.
//!
//! Each child set of a destination project is fully owned by it: on every
//! pass the existing rows are deleted and re-derived from the current source
//! state. Steps run in a fixed order (counties, pre-bid meetings, estimated
//! costs) and a failing step never prevents the following ones.

use std::fmt;

use tracing::{debug, error, warn};

use crate::cost::parse_costs;
use crate::error::AppError;
use crate::legacy::SourceProject;
use crate::mapper::clean;
use crate::models::{EstCostDetail, PreBidInfo, ProjCounty};
use crate::status::SyncStatus;
use crate::traits::{DestinationStore, SourceStore, SourceTable};

/// One child-replacement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStep {
    Counties,
    PreBids,
    EstCosts,
}

impl ChildStep {
    pub const ORDER: [ChildStep; 3] = [ChildStep::Counties, ChildStep::PreBids, ChildStep::EstCosts];
}

impl fmt::Display for ChildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChildStep::Counties => "counties",
            ChildStep::PreBids => "pre_bids",
            ChildStep::EstCosts => "est_costs",
        };
        f.write_str(name)
    }
}

/// What a resolution pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub counties: usize,
    /// County rows skipped because the county does not exist in the destination.
    pub missing_counties: usize,
    pub pre_bids: usize,
    pub est_costs: usize,
    pub failed_steps: Vec<ChildStep>,
}

impl ResolutionReport {
    pub fn is_complete(&self) -> bool {
        self.failed_steps.is_empty()
    }
}

/// Replaces the child collections of one destination project.
pub struct DependencyResolver<'a, S, D> {
    source: &'a S,
    destination: &'a D,
}

impl<'a, S, D> DependencyResolver<'a, S, D>
where
    S: SourceStore,
    D: DestinationStore,
{
    pub fn new(source: &'a S, destination: &'a D) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Runs every step for `project`, whose destination id is `proj_id`.
    pub async fn resolve(&self, project: &SourceProject, proj_id: i64) -> ResolutionReport {
        let mut report = ResolutionReport::default();

        for step in ChildStep::ORDER {
            let result = match step {
                ChildStep::Counties => self.replace_counties(project, proj_id, &mut report).await,
                ChildStep::PreBids => self.replace_pre_bids(project, proj_id, &mut report).await,
                ChildStep::EstCosts => self.replace_est_costs(project, proj_id, &mut report).await,
            };

            if let Err(e) = result {
                error!(
                    source_id = project.id,
                    proj_id,
                    step = %step,
                    error = %e,
                    "Child resolution step failed"
                );
                report.failed_steps.push(step);
            }
        }

        debug!(
            source_id = project.id,
            proj_id,
            counties = report.counties,
            pre_bids = report.pre_bids,
            est_costs = report.est_costs,
            "Resolved project children"
        );
        report
    }

    async fn replace_counties(
        &self,
        project: &SourceProject,
        proj_id: i64,
        report: &mut ResolutionReport,
    ) -> Result<(), AppError> {
        let rows = self.source.project_counties(project.id).await?;
        self.destination.delete_proj_counties(proj_id).await?;

        for row in &rows {
            let Some(county_id) = self
                .destination
                .find_county_id(&row.county_name, &row.state)
                .await?
            else {
                warn!(
                    source_id = project.id,
                    county = %row.county_name,
                    state = %row.state,
                    "County not found in destination, skipping"
                );
                report.missing_counties += 1;
                continue;
            };

            let county = ProjCounty {
                id: 0,
                proj_id,
                county_id,
                sync_pro_county_id: row.id,
                sync_status: SyncStatus::Unchanged,
            };
            self.destination.insert_proj_county(&county).await?;
            report.counties += 1;

            if row.sync_status.needs_sync() {
                self.source
                    .mark_synced(SourceTable::ProjectCounties, row.id)
                    .await?;
            }
        }
        Ok(())
    }

    async fn replace_pre_bids(
        &self,
        project: &SourceProject,
        proj_id: i64,
        report: &mut ResolutionReport,
    ) -> Result<(), AppError> {
        if !project.has_pre_bid() {
            return Ok(());
        }

        self.destination.delete_pre_bids(proj_id).await?;
        for pre_bid in pre_bids_for(project, proj_id) {
            self.destination.insert_pre_bid(&pre_bid).await?;
            report.pre_bids += 1;
        }
        Ok(())
    }

    async fn replace_est_costs(
        &self,
        project: &SourceProject,
        proj_id: i64,
        report: &mut ResolutionReport,
    ) -> Result<(), AppError> {
        let costs = est_costs_for(project, proj_id);

        self.destination.delete_est_costs(proj_id).await?;
        for cost in &costs {
            self.destination.insert_est_cost(cost).await?;
            report.est_costs += 1;
        }
        Ok(())
    }
}

/// One pre-bid row per populated date/location pair, in source order.
pub fn pre_bids_for(project: &SourceProject, proj_id: i64) -> Vec<PreBidInfo> {
    let slots = [
        (
            project.pre_bid_date1,
            &project.pre_bid_loc1,
            project.pre_bid_mandatory1,
        ),
        (
            project.pre_bid_date2,
            &project.pre_bid_loc2,
            project.pre_bid_mandatory2,
        ),
    ];

    slots
        .into_iter()
        .filter_map(|(date, location, mandatory)| date.map(|d| (d, location, mandatory)))
        .enumerate()
        .map(|(i, (date, location, mandatory))| PreBidInfo {
            id: 0,
            proj_id,
            pre_bid_date: date,
            location: clean(location),
            is_mandatory: mandatory,
            sort_order: i as i16 + 1,
            sync_pro_id: project.id,
            sync_status: SyncStatus::Unchanged,
        })
        .collect()
}

/// One cost row per parseable estimated-cost column, in source order.
pub fn est_costs_for(project: &SourceProject, proj_id: i64) -> Vec<EstCostDetail> {
    parse_costs(project.est_costs())
        .into_iter()
        .enumerate()
        .map(|(i, range)| EstCostDetail {
            id: 0,
            proj_id,
            cost_from: range.from,
            cost_to: range.to,
            description: range.description,
            range_sign: range.range_sign,
            sort_order: i as i16 + 1,
            sync_pro_id: project.id,
            sync_status: SyncStatus::Unchanged,
        })
        .collect()
}
