// Protocol error taxonomy
// Closed set of error kinds produced at the ledger boundary.
// No component downstream of ledger::revert matches on raw revert
// selectors or reason strings again.

use thiserror::Error;

/// Errors surfaced by the registry, vote admission, and admin paths
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The external identifier is already bound to a different commitment.
    /// Permanent; never retried.
    #[error("Identifier already bound to a different commitment")]
    Conflict,

    /// The nullifier has already been recorded for this election. Permanent.
    #[error("You have already voted in this election")]
    DuplicateVote,

    /// The proof failed ledger-side verification. The caller must regenerate.
    #[error("Invalid zero-knowledge proof")]
    InvalidProof,

    /// The merkle root is not part of the group or has expired. The caller
    /// must refetch the current root and regenerate the proof.
    #[error("Merkle root is unknown or expired; refetch and regenerate proof")]
    StaleRoot,

    /// Sequence-number conflicts persisted through the submitter's retry
    /// bound. Caller-retryable.
    #[error("Transaction ordering conflict persisted through {attempts} retries")]
    NonceExhausted { attempts: u32 },

    /// Network or RPC failure talking to the ledger. Caller-retryable.
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// The write requires the contract owner identity. Permanent.
    #[error("Only the contract owner can perform this action")]
    NotAuthorized,

    /// A proposal write was attempted outside the submission window.
    #[error("Proposal window closed: {0}")]
    ProposalWindowClosed(String),

    /// A revert that matched no known selector or reason pattern. Surfaced
    /// with raw detail for diagnosis, never silently swallowed.
    #[error("Unclassified contract revert (selector: {selector:?}, reason: {reason:?})")]
    UnclassifiedContract {
        selector: Option<String>,
        reason: Option<String>,
    },

    /// Mapping-store failure during registration or lookup.
    #[error("Mapping store failure: {0}")]
    Store(String),

    /// The request was malformed before any ledger call was made.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProtocolError {
    /// Whether the error is permanent (retrying with the same inputs
    /// can never succeed)
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProtocolError::Conflict
                | ProtocolError::DuplicateVote
                | ProtocolError::InvalidProof
                | ProtocolError::StaleRoot
                | ProtocolError::NotAuthorized
                | ProtocolError::ProposalWindowClosed(_)
                | ProtocolError::InvalidRequest(_)
        )
    }

    /// Whether the caller may retry the operation as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProtocolError::NonceExhausted { .. } | ProtocolError::LedgerUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_vs_retryable() {
        assert!(ProtocolError::Conflict.is_permanent());
        assert!(ProtocolError::DuplicateVote.is_permanent());
        assert!(!ProtocolError::Conflict.is_retryable());
        assert!(ProtocolError::NonceExhausted { attempts: 3 }.is_retryable());
        assert!(ProtocolError::LedgerUnavailable("rpc down".to_string()).is_retryable());
        assert!(!ProtocolError::LedgerUnavailable("rpc down".to_string()).is_permanent());
    }

    #[test]
    fn test_stale_root_is_permanent_for_given_proof() {
        assert!(ProtocolError::StaleRoot.is_permanent());
        assert!(!ProtocolError::StaleRoot.is_retryable());
    }
}
