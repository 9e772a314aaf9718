//! Bidsync Core - Domain types, entity mapping and the reconciliation engine.
//!
//! The engine reads legacy rows flagged `New` or `Updated`, writes their
//! counterparts into the bidding-platform database and flips the legacy flag
//! to `Synced`. Storage, identity and filesystem access sit behind the traits
//! in [`traits`] and are implemented by the `bidsync-db` and
//! `bidsync-client` crates.

pub mod config;
pub mod cost;
pub mod engine;
pub mod error;
pub mod folders;
pub mod legacy;
pub mod mapper;
pub mod models;
pub mod resolver;
pub mod retry;
pub mod runner;
pub mod status;
pub mod sync;
pub mod traits;

#[cfg(test)]
mod testing;

pub use config::{default_config_path, load_file_config, DbConfig, FileConfig, SyncConfig};
pub use cost::{parse_cost, CostRange, RangeSign};
pub use engine::ReconciliationEngine;
pub use error::{AppError, ErrorClass};
pub use folders::UploadFolders;
pub use legacy::{LinkRole, SourceRow};
pub use mapper::ProjectNumber;
pub use resolver::{DependencyResolver, ResolutionReport};
pub use retry::{with_backoff, RetryPolicy};
pub use runner::BatchRunner;
pub use status::{RowError, RowStage, StatusEvent, SyncStatus};
pub use sync::{BatchSummary, EntityKind, EntityKindResult, SyncOutcome, SyncStats};
pub use traits::{
    CredentialProvisioner, DestinationStore, FolderProvisioner, SourceStore, SourceTable,
};
