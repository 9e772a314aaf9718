//! Batch scheduling.
//!
//! [`BatchRunner`] owns the engine and guarantees that at most one batch runs
//! at a time. Ticks that fire while a batch is still in flight are skipped,
//! not queued.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::engine::ReconciliationEngine;
use crate::sync::BatchSummary;
use crate::traits::{CredentialProvisioner, DestinationStore, FolderProvisioner, SourceStore};

pub struct BatchRunner<S, D, F, C> {
    engine: ReconciliationEngine<S, D, F, C>,
    in_flight: Mutex<()>,
    interval: Duration,
    run_on_start: bool,
}

impl<S, D, F, C> BatchRunner<S, D, F, C>
where
    S: SourceStore,
    D: DestinationStore,
    F: FolderProvisioner,
    C: CredentialProvisioner,
{
    pub fn new(engine: ReconciliationEngine<S, D, F, C>) -> Self {
        let SyncConfig {
            interval,
            run_on_start,
            ..
        } = engine.config().clone();
        Self {
            engine,
            in_flight: Mutex::new(()),
            interval,
            run_on_start,
        }
    }

    pub fn engine(&self) -> &ReconciliationEngine<S, D, F, C> {
        &self.engine
    }

    /// Runs one batch unless another one is in flight, in which case `None`
    /// is returned immediately.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Option<BatchSummary> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("Previous sync batch still running, skipping");
            return None;
        };
        Some(self.engine.run_batch(cancel).await)
    }

    /// Runs batches on a fixed interval until `cancel` fires. Returns the
    /// number of batches that ran.
    pub async fn run_scheduled(&self, cancel: CancellationToken) -> usize {
        let period = self.interval.max(Duration::from_millis(1));
        let start = if self.run_on_start {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = period.as_secs(),
            run_on_start = self.run_on_start,
            "Sync scheduler started"
        );

        let mut batches = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(summary) = self.run_once(&cancel).await {
                        batches += 1;
                        if summary.cancelled {
                            break;
                        }
                    }
                }
            }
        }

        info!(batches, "Sync scheduler stopped");
        batches
    }
}
