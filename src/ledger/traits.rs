// Ledger client trait
// Typed read/write access to the election ledger and membership-group
// contracts. Call semantics only; no protocol logic lives here.

use super::types::{PendingTx, TxReceipt, Uint256, WriteCall};
use crate::election::{Election, PendingProposal, Proposal};
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a ledger client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Network or RPC transport failure
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// A bounded client-side timeout elapsed. Ambiguous for writes: the
    /// write may still have landed.
    #[error("Ledger call timed out")]
    Timeout,

    /// The write's sequence number collided with another write from the
    /// same sender
    #[error("Sequence number conflict: {0}")]
    NonceConflict(String),

    /// The contract reverted the call
    #[error("Contract reverted (selector: {selector:?}, reason: {reason:?})")]
    Reverted {
        /// Four-byte custom error selector, as `0x`-prefixed hex
        selector: Option<String>,
        /// String revert reason, if the contract supplied one
        reason: Option<String>,
    },

    /// A read referenced an entity the contract does not know
    #[error("Not found: {0}")]
    NotFound(String),
}

impl LedgerError {
    /// Build a revert carrying only a custom error selector
    pub fn revert_selector(selector: &str) -> Self {
        LedgerError::Reverted {
            selector: Some(selector.to_string()),
            reason: None,
        }
    }

    /// Build a revert carrying only a reason string
    pub fn revert_reason(reason: &str) -> Self {
        LedgerError::Reverted {
            selector: None,
            reason: Some(reason.to_string()),
        }
    }
}

/// Typed client for the election ledger and membership-group contracts
///
/// Reads are side-effect-free and may run with unbounded concurrency.
/// Writes are sent with an explicit sequence number and complete
/// asynchronously via `await_mined`.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    // ------------------------------------------------------------------
    // Election reads
    // ------------------------------------------------------------------

    /// Fetch every election on the ledger
    async fn get_all_elections(&self) -> Result<Vec<Election>, LedgerError>;

    /// Fetch one election by ID
    async fn get_election(&self, election_id: u64) -> Result<Election, LedgerError>;

    /// Fetch an election's proposals, in index order
    async fn get_proposals(&self, election_id: u64) -> Result<Vec<Proposal>, LedgerError>;

    /// Fetch an election's vote counts, in proposal-index order
    async fn check_votes(&self, election_id: u64) -> Result<Vec<u64>, LedgerError>;

    /// Fetch an election's unprocessed pending proposals
    async fn get_pending_proposals(
        &self,
        election_id: u64,
    ) -> Result<Vec<PendingProposal>, LedgerError>;

    // ------------------------------------------------------------------
    // Membership-group reads
    // ------------------------------------------------------------------

    /// Fetch the full commitment list of a group, in insertion order
    async fn group_members(&self, group_id: u64) -> Result<Vec<Uint256>, LedgerError>;

    /// Fetch the current merkle root of a group
    async fn merkle_root(&self, group_id: u64) -> Result<Uint256, LedgerError>;

    /// Fetch the group new members are currently added to
    async fn current_group_id(&self) -> Result<u64, LedgerError>;

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Fetch the operator's next sequence number. Never cached; the
    /// submitter calls this immediately before every send.
    async fn transaction_count(&self) -> Result<u64, LedgerError>;

    /// Send a write carrying the given sequence number
    async fn send(&self, call: &WriteCall, nonce: u64) -> Result<PendingTx, LedgerError>;

    /// Wait for a sent write to be mined
    async fn await_mined(&self, pending: PendingTx) -> Result<TxReceipt, LedgerError>;
}
