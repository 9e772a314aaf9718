//! Sync status lifecycle shared by every synchronizable source row.
//!
//! The status column is a small integer owned by the legacy database. Rows are
//! flagged `New` or `Updated` by the external writer and flipped to `Synced`
//! by the engine once their destination counterpart is durably persisted.
//! Freshly created destination rows carry `Unchanged`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::error::AppError;

/// Four-valued sync flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum SyncStatus {
    /// Already synced or system-owned. Resting state of destination rows.
    #[default]
    Unchanged = 0,
    /// Created in the source, never synchronized.
    New = 1,
    /// Changed in the source since the last synchronization.
    Updated = 2,
    /// Consumed by the engine.
    Synced = 3,
}

/// Events that drive [`SyncStatus::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// The external writer changed the source row.
    SourceChanged,
    /// The engine durably persisted the destination counterpart.
    Persisted,
}

/// Raised when a stored status code is outside `0..=3`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sync status code {0}")]
pub struct UnknownStatus(pub i16);

impl SyncStatus {
    /// Integer code as stored in the database.
    pub fn code(self) -> i16 {
        self as i16
    }

    /// True when the row participates in the next batch.
    pub fn needs_sync(self) -> bool {
        matches!(self, SyncStatus::New | SyncStatus::Updated)
    }

    /// True when the row has never been synchronized.
    pub fn is_fresh_insert(self) -> bool {
        self == SyncStatus::New
    }

    /// The single transition function for the status lifecycle.
    ///
    /// `Persisted` is only legal from `New` or `Updated`, which is what keeps
    /// the engine from ever regressing a row.
    pub fn transition(self, event: StatusEvent) -> Result<SyncStatus, AppError> {
        match (self, event) {
            (SyncStatus::New, StatusEvent::SourceChanged) => Ok(SyncStatus::New),
            (_, StatusEvent::SourceChanged) => Ok(SyncStatus::Updated),
            (SyncStatus::New | SyncStatus::Updated, StatusEvent::Persisted) => {
                Ok(SyncStatus::Synced)
            }
            (from, StatusEvent::Persisted) => Err(AppError::InvalidTransition(format!(
                "cannot mark a row synced from status {}",
                from
            ))),
        }
    }

    /// Shorthand for `transition(StatusEvent::Persisted)`.
    pub fn mark_synced(self) -> Result<SyncStatus, AppError> {
        self.transition(StatusEvent::Persisted)
    }
}

impl TryFrom<i16> for SyncStatus {
    type Error = UnknownStatus;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SyncStatus::Unchanged),
            1 => Ok(SyncStatus::New),
            2 => Ok(SyncStatus::Updated),
            3 => Ok(SyncStatus::Synced),
            other => Err(UnknownStatus(other)),
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStatus::Unchanged => "unchanged",
            SyncStatus::New => "new",
            SyncStatus::Updated => "updated",
            SyncStatus::Synced => "synced",
        };
        f.write_str(name)
    }
}

/// Per-row processing stage.
///
/// Stages are strictly ordered; a row that fails is reported with the stage it
/// had reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RowStage {
    Pending,
    Mapped,
    Persisted,
    ChildrenResolved,
    SourceMarkedSynced,
}

impl fmt::Display for RowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RowStage::Pending => "pending",
            RowStage::Mapped => "mapped",
            RowStage::Persisted => "persisted",
            RowStage::ChildrenResolved => "children_resolved",
            RowStage::SourceMarkedSynced => "source_marked_synced",
        };
        f.write_str(name)
    }
}

/// An error tagged with the stage at which a row failed.
#[derive(Debug, Error)]
#[error("{source} (at stage {stage})")]
pub struct RowError {
    pub stage: RowStage,
    #[source]
    pub source: AppError,
}

/// Attaches a [`RowStage`] to a fallible result.
pub trait AtStage<T> {
    fn at(self, stage: RowStage) -> Result<T, RowError>;
}

impl<T, E: Into<AppError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: RowStage) -> Result<T, RowError> {
        self.map_err(|e| RowError {
            stage,
            source: e.into(),
        })
    }
}
