//! Sync outcomes and statistics.
//!
//! Pure bookkeeping types shared by the engine and the batch runner,
//! decoupled from I/O operations and CLI orchestration.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::traits::SourceTable;
use crate::legacy::LinkRole;

/// Entity kinds processed by a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Member,
    Contact,
    Contractor,
    ArchOwner,
    Project,
    Addendum,
    ContractorLink,
    ArchOwnerLink,
}

impl EntityKind {
    /// Fixed processing order. Parents precede the kinds that resolve them
    /// by back-reference.
    pub const ORDER: [EntityKind; 8] = [
        EntityKind::Member,
        EntityKind::Contact,
        EntityKind::Contractor,
        EntityKind::ArchOwner,
        EntityKind::Project,
        EntityKind::Addendum,
        EntityKind::ContractorLink,
        EntityKind::ArchOwnerLink,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Member => "member",
            EntityKind::Contact => "contact",
            EntityKind::Contractor => "contractor",
            EntityKind::ArchOwner => "arch_owner",
            EntityKind::Project => "project",
            EntityKind::Addendum => "addendum",
            EntityKind::ContractorLink => "contractor_link",
            EntityKind::ArchOwnerLink => "arch_owner_link",
        }
    }

    /// Source table whose status column this kind flips.
    pub fn table(self) -> SourceTable {
        match self {
            EntityKind::Member => SourceTable::Members,
            EntityKind::Contact => SourceTable::MemberContacts,
            EntityKind::Contractor => SourceTable::Contractors,
            EntityKind::ArchOwner => SourceTable::ArchOwners,
            EntityKind::Project => SourceTable::Projects,
            EntityKind::Addendum => SourceTable::Addenda,
            EntityKind::ContractorLink => SourceTable::ProjectContractors,
            EntityKind::ArchOwnerLink => SourceTable::ProjectArchOwners,
        }
    }

    /// Link role for the two link kinds.
    pub fn link_role(self) -> Option<LinkRole> {
        match self {
            EntityKind::ContractorLink => Some(LinkRole::Contractor),
            EntityKind::ArchOwnerLink => Some(LinkRole::ArchOwner),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of processing a single source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No destination counterpart existed; one was inserted.
    Created,
    /// The destination counterpart was updated in place.
    Updated,
    /// A dependency was missing; the row stays eligible for the next run.
    Skipped,
    /// Processing failed; the source status was not advanced.
    Failed,
}

/// Statistics for one entity kind.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncStats {
    /// Creates a new empty stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome, incrementing the appropriate counter.
    pub fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Created => self.created += 1,
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Skipped => self.skipped += 1,
            SyncOutcome::Failed => self.failed += 1,
        }
    }

    /// Returns the total number of processed rows.
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed
    }

    /// Returns the number of rows that reached the destination and were marked synced.
    pub fn successful(&self) -> usize {
        self.created + self.updated
    }
}

/// Result of processing one entity kind in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct EntityKindResult {
    pub kind: EntityKind,
    pub stats: SyncStats,
    /// Set when the pending rows could not even be queried.
    pub error: Option<String>,
}

impl EntityKindResult {
    pub fn success(kind: EntityKind, stats: SyncStats) -> Self {
        Self {
            kind,
            stats,
            error: None,
        }
    }

    pub fn failure(kind: EntityKind, error: String) -> Self {
        Self {
            kind,
            stats: SyncStats::default(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated results of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<EntityKindResult>,
    /// True when the batch stopped early on cancellation.
    pub cancelled: bool,
}

impl Default for BatchSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchSummary {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
            cancelled: false,
        }
    }

    pub fn add(&mut self, result: EntityKindResult) {
        self.results.push(result);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Stats of one kind, if it was processed.
    pub fn stats_for(&self, kind: EntityKind) -> Option<&SyncStats> {
        self.results
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| &r.stats)
    }

    /// Number of kinds whose pending rows could not be queried.
    pub fn failed_kinds(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    /// Totals across every kind.
    pub fn totals(&self) -> SyncStats {
        self.results.iter().fold(SyncStats::default(), |mut acc, r| {
            acc.created += r.stats.created;
            acc.updated += r.stats.updated;
            acc.skipped += r.stats.skipped;
            acc.failed += r.stats.failed;
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_stats_default() {
        let stats = SyncStats::new();
        assert_eq!(stats.total(), 0);
        assert_eq!(stats.successful(), 0);
    }

    #[test]
    fn test_sync_stats_record() {
        let mut stats = SyncStats::new();
        stats.record(SyncOutcome::Created);
        stats.record(SyncOutcome::Updated);
        stats.record(SyncOutcome::Skipped);
        stats.record(SyncOutcome::Failed);

        assert_eq!(stats.created, 1);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.successful(), 2);
    }

    #[test]
    fn test_order_puts_parents_first() {
        let pos = |k| EntityKind::ORDER.iter().position(|x| *x == k).unwrap();
        assert!(pos(EntityKind::Member) < pos(EntityKind::Contact));
        assert!(pos(EntityKind::Project) < pos(EntityKind::Addendum));
        assert!(pos(EntityKind::Project) < pos(EntityKind::ContractorLink));
        assert!(pos(EntityKind::Contractor) < pos(EntityKind::ContractorLink));
        assert!(pos(EntityKind::ArchOwner) < pos(EntityKind::ArchOwnerLink));
    }

    #[test]
    fn test_kind_tables_and_roles() {
        assert_eq!(EntityKind::Contact.table(), SourceTable::MemberContacts);
        assert_eq!(
            EntityKind::ArchOwnerLink.link_role(),
            Some(LinkRole::ArchOwner)
        );
        assert_eq!(EntityKind::Project.link_role(), None);
    }

    #[test]
    fn test_batch_summary_mixed_results() {
        let mut summary = BatchSummary::new();
        summary.add(EntityKindResult::success(
            EntityKind::Member,
            SyncStats {
                created: 3,
                updated: 1,
                skipped: 0,
                failed: 1,
            },
        ));
        summary.add(EntityKindResult::failure(
            EntityKind::Contact,
            "relation does not exist".into(),
        ));
        summary.add(EntityKindResult::success(
            EntityKind::Project,
            SyncStats {
                created: 2,
                updated: 0,
                skipped: 1,
                failed: 0,
            },
        ));

        assert_eq!(summary.failed_kinds(), 1);
        let totals = summary.totals();
        assert_eq!(totals.created, 5);
        assert_eq!(totals.failed, 1);
        assert_eq!(totals.total(), 8);
        assert_eq!(summary.stats_for(EntityKind::Project).unwrap().skipped, 1);
        assert!(summary.stats_for(EntityKind::Addendum).is_none());
    }
}
