// Transaction submitter
// Fetches a fresh sequence number immediately before every send (never
// cached), attaches it, and retries sequence-number conflicts with a
// linearly growing backoff. After the bound is exhausted the caller
// sees a distinct NonceExhausted error instead of the raw conflict.

use crate::error::ProtocolError;
use crate::ledger::{classify, LedgerClient, LedgerError, TxReceipt, WriteCall};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors surfaced by the submitter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Sequence-number conflicts persisted through every retry
    #[error("Sequence number conflicts persisted through {attempts} retries")]
    NonceExhausted { attempts: u32 },

    /// Any other ledger failure, passed through unclassified
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<SubmitError> for ProtocolError {
    fn from(error: SubmitError) -> Self {
        match error {
            SubmitError::NonceExhausted { attempts } => ProtocolError::NonceExhausted { attempts },
            SubmitError::Ledger(inner) => classify(inner),
            SubmitError::InvalidConfig(message) => ProtocolError::InvalidRequest(message),
        }
    }
}

// ============================================================================
// SUBMITTER CONFIG
// ============================================================================

/// Configuration for the transaction submitter
#[derive(Clone, Debug)]
pub struct SubmitterConfig {
    /// Maximum number of retries after a sequence-number conflict
    pub max_retries: u32,
    /// Backoff step; retry N sleeps N * step
    pub backoff_step_ms: u64,
}

impl SubmitterConfig {
    /// Create a new config with builder pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the backoff step in milliseconds
    pub fn with_backoff_step_ms(mut self, ms: u64) -> Self {
        self.backoff_step_ms = ms;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SubmitError> {
        // max_retries of 0 is allowed: single attempt, no retry. But a
        // retrying config with no backoff would hammer the ledger.
        if self.max_retries > 0 && self.backoff_step_ms == 0 {
            return Err(SubmitError::InvalidConfig(
                "backoff_step_ms must be > 0 when retries are enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step_ms: 200,
        }
    }
}

// ============================================================================
// SUBMITTER STATS
// ============================================================================

/// Statistics about submitter operations
#[derive(Clone, Debug, Default)]
pub struct SubmitterStats {
    pub submitted: u64,
    pub confirmed: u64,
    pub nonce_conflicts: u64,
    pub exhausted: u64,
}

#[derive(Default)]
struct StatCounters {
    submitted: AtomicU64,
    confirmed: AtomicU64,
    nonce_conflicts: AtomicU64,
    exhausted: AtomicU64,
}

// ============================================================================
// TX SUBMITTER
// ============================================================================

/// Nonce-serializing transaction submitter
///
/// Safe to call concurrently from multiple flows: there is no shared
/// mutable nonce state, only fresh-fetch-plus-retry. Callers issuing
/// many back-to-back writes (the lifecycle monitor) should still await
/// each submission before starting the next, since concurrent sends from
/// one identity raise the conflict probability combinatorially.
pub struct TxSubmitter<C: LedgerClient> {
    client: Arc<C>,
    config: SubmitterConfig,
    stats: StatCounters,
}

impl<C: LedgerClient> TxSubmitter<C> {
    /// Create a new submitter over a ledger client
    pub fn new(client: Arc<C>, config: SubmitterConfig) -> Self {
        Self {
            client,
            config,
            stats: StatCounters::default(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Get a snapshot of the statistics
    pub fn stats(&self) -> SubmitterStats {
        SubmitterStats {
            submitted: self.stats.submitted.load(Ordering::Relaxed),
            confirmed: self.stats.confirmed.load(Ordering::Relaxed),
            nonce_conflicts: self.stats.nonce_conflicts.load(Ordering::Relaxed),
            exhausted: self.stats.exhausted.load(Ordering::Relaxed),
        }
    }

    /// Submit a write and wait for it to be mined
    ///
    /// One initial attempt plus up to `max_retries` retries on
    /// sequence-number conflicts, sleeping `retry * backoff_step_ms`
    /// before each retry. Every other failure surfaces immediately.
    pub async fn submit(&self, call: &WriteCall) -> Result<TxReceipt, SubmitError> {
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);

        let mut retries = 0u32;
        loop {
            // Fresh sequence number, fetched right before the send
            let nonce = self.client.transaction_count().await?;
            debug!(
                function = call.function_name(),
                nonce, "sending ledger write"
            );

            let conflict = match self.client.send(call, nonce).await {
                Ok(pending) => match self.client.await_mined(pending).await {
                    Ok(receipt) => {
                        self.stats.confirmed.fetch_add(1, Ordering::Relaxed);
                        info!(
                            function = call.function_name(),
                            tx_hash = %receipt.tx_hash(),
                            block = receipt.block_number(),
                            "ledger write mined"
                        );
                        return Ok(receipt);
                    }
                    Err(LedgerError::NonceConflict(message)) => message,
                    Err(error) => return Err(SubmitError::Ledger(error)),
                },
                Err(LedgerError::NonceConflict(message)) => message,
                Err(error) => return Err(SubmitError::Ledger(error)),
            };

            self.stats.nonce_conflicts.fetch_add(1, Ordering::Relaxed);
            if retries >= self.config.max_retries {
                self.stats.exhausted.fetch_add(1, Ordering::Relaxed);
                warn!(
                    function = call.function_name(),
                    retries, "sequence-number conflicts exhausted retry budget"
                );
                return Err(SubmitError::NonceExhausted {
                    attempts: self.config.max_retries,
                });
            }

            retries += 1;
            let backoff = Duration::from_millis(retries as u64 * self.config.backoff_step_ms);
            debug!(
                function = call.function_name(),
                retry = retries,
                backoff_ms = backoff.as_millis() as u64,
                conflict, "sequence number conflict, backing off"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}
