// Lifecycle monitor
// Periodic control loop that advances each election's state machine:
// Scheduled -> Active -> Finalized, never reversed. Sole writer of the
// active/finalized fields. Guards are evaluated against freshly fetched
// ledger state, never a local cache.

use super::model::{finalize_due, start_due};
use crate::clock::Clock;
use crate::ledger::{LedgerClient, WriteCall};
use crate::submitter::TxSubmitter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors from monitor configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// MONITOR CONFIG
// ============================================================================

/// Configuration for the lifecycle monitor
///
/// The polling period is a deployment parameter, not a protocol
/// invariant; both transitions are safe to re-attempt on any later tick.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Polling period in seconds
    pub poll_interval_secs: u64,
}

impl MonitorConfig {
    /// Create a new config with builder pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the polling period in seconds
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.poll_interval_secs == 0 {
            return Err(MonitorError::InvalidConfig(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
        }
    }
}

// ============================================================================
// TICK REPORT
// ============================================================================

/// What one monitor tick did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Start transitions successfully submitted
    pub starts: u32,
    /// Finalize transitions successfully submitted
    pub finalizes: u32,
    /// Transition submissions that failed (logged, retried next tick)
    pub failures: u32,
}

/// Statistics across all ticks
#[derive(Clone, Debug, Default)]
pub struct MonitorStats {
    pub ticks: u64,
    pub starts: u64,
    pub finalizes: u64,
    pub failures: u64,
}

#[derive(Default)]
struct StatCounters {
    ticks: AtomicU64,
    starts: AtomicU64,
    finalizes: AtomicU64,
    failures: AtomicU64,
}

// ============================================================================
// LIFECYCLE MONITOR
// ============================================================================

/// Periodic election lifecycle driver
pub struct LifecycleMonitor<C: LedgerClient> {
    client: Arc<C>,
    submitter: Arc<TxSubmitter<C>>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
    stats: StatCounters,
}

impl<C: LedgerClient> LifecycleMonitor<C> {
    /// Create a new monitor
    pub fn new(
        client: Arc<C>,
        submitter: Arc<TxSubmitter<C>>,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            client,
            submitter,
            clock,
            config,
            stats: StatCounters::default(),
        }
    }

    /// Get a snapshot of the statistics
    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            ticks: self.stats.ticks.load(Ordering::Relaxed),
            starts: self.stats.starts.load(Ordering::Relaxed),
            finalizes: self.stats.finalizes.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
        }
    }

    /// Run the control loop until the task is dropped
    pub async fn run(&self) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            "lifecycle monitor running"
        );
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// Evaluate every election once
    ///
    /// Elections are processed independently; one election's failure
    /// never stops evaluation of the others. Transition writes are
    /// issued sequentially, since concurrent writes from the one
    /// operator identity would race on sequence numbers.
    pub async fn tick(&self) -> TickReport {
        self.stats.ticks.fetch_add(1, Ordering::Relaxed);
        let mut report = TickReport::default();

        let elections = match self.client.get_all_elections().await {
            Ok(elections) => elections,
            Err(err) => {
                error!(%err, "failed to fetch elections");
                report.failures += 1;
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                return report;
            }
        };

        let now = self.clock.now();
        debug!(now, elections = elections.len(), "monitor tick");

        for election in &elections {
            let election_id = election.election_id();

            if start_due(election, now) {
                info!(election_id, name = election.name(), "starting election");
                match self
                    .submitter
                    .submit(&WriteCall::StartElection { election_id })
                    .await
                {
                    Ok(_) => {
                        report.starts += 1;
                        self.stats.starts.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        // Next tick re-evaluates the guard; the ledger
                        // rejects a re-start harmlessly.
                        error!(election_id, %err, "failed to start election");
                        report.failures += 1;
                        self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }

            if finalize_due(election, now) {
                info!(election_id, name = election.name(), "finalizing election");
                match self
                    .submitter
                    .submit(&WriteCall::FinalizeElection { election_id })
                    .await
                {
                    Ok(_) => {
                        report.finalizes += 1;
                        self.stats.finalizes.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        error!(election_id, %err, "failed to finalize election");
                        report.failures += 1;
                        self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }

        report
    }
}
