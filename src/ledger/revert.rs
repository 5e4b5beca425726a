// Revert classification
// The single place where raw revert selectors and reason strings are
// interpreted. Everything downstream works with the ProtocolError
// taxonomy.

use super::traits::LedgerError;
use crate::error::ProtocolError;

/// Membership-group verifier: nullifier reuse
pub const SELECTOR_DUPLICATE_NULLIFIER: &str = "0x208b15e8";

/// Membership-group verifier: proof failed verification
pub const SELECTOR_INVALID_PROOF: &str = "0x4aa6bc40";

/// Membership-group verifier: merkle root not part of the group
pub const SELECTOR_UNKNOWN_ROOT: &str = "0x4d329586";

/// Ledger-side reason for re-adding a commitment that is already a member
const REASON_MEMBER_EXISTS: &str = "Identity commitment already exists";

/// Classify a ledger error into exactly one taxonomy entry
///
/// Callers of the registry, vote admission, and admin paths never see a
/// raw `LedgerError`.
pub fn classify(error: LedgerError) -> ProtocolError {
    match error {
        LedgerError::Unavailable(message) => ProtocolError::LedgerUnavailable(message),
        LedgerError::Timeout => {
            ProtocolError::LedgerUnavailable("Ledger call timed out".to_string())
        }
        // A stray conflict that did not pass through the submitter is
        // still transient from the caller's point of view.
        LedgerError::NonceConflict(message) => ProtocolError::LedgerUnavailable(message),
        LedgerError::NotFound(message) => ProtocolError::InvalidRequest(message),
        LedgerError::Reverted { selector, reason } => classify_revert(selector, reason),
    }
}

fn classify_revert(selector: Option<String>, reason: Option<String>) -> ProtocolError {
    if let Some(selector) = selector.as_deref() {
        match selector {
            SELECTOR_DUPLICATE_NULLIFIER => return ProtocolError::DuplicateVote,
            SELECTOR_INVALID_PROOF => return ProtocolError::InvalidProof,
            SELECTOR_UNKNOWN_ROOT => return ProtocolError::StaleRoot,
            _ => {}
        }
    }

    if let Some(reason) = reason.as_deref() {
        if reason.contains("Nullifier was already used") {
            return ProtocolError::DuplicateVote;
        }
        if reason.contains("root") && (reason.contains("expired") || reason.contains("not part")) {
            return ProtocolError::StaleRoot;
        }
        if reason.contains("Only owner") {
            return ProtocolError::NotAuthorized;
        }
        if reason.contains("Cannot submit proposals") || reason.contains("Cannot accept proposals") {
            return ProtocolError::ProposalWindowClosed(reason.to_string());
        }
    }

    ProtocolError::UnclassifiedContract { selector, reason }
}

/// Whether the error is the ledger saying the commitment is already a
/// group member. The registry treats this as success-equivalent so a
/// retried registration can converge after a partial failure.
pub fn is_member_exists(error: &LedgerError) -> bool {
    matches!(
        error,
        LedgerError::Reverted { reason: Some(reason), .. } if reason.contains(REASON_MEMBER_EXISTS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selectors() {
        assert_eq!(
            classify(LedgerError::revert_selector(SELECTOR_DUPLICATE_NULLIFIER)),
            ProtocolError::DuplicateVote
        );
        assert_eq!(
            classify(LedgerError::revert_selector(SELECTOR_INVALID_PROOF)),
            ProtocolError::InvalidProof
        );
        assert_eq!(
            classify(LedgerError::revert_selector(SELECTOR_UNKNOWN_ROOT)),
            ProtocolError::StaleRoot
        );
    }

    #[test]
    fn test_reason_patterns() {
        assert_eq!(
            classify(LedgerError::revert_reason("Nullifier was already used")),
            ProtocolError::DuplicateVote
        );
        assert_eq!(
            classify(LedgerError::revert_reason("Merkle root is expired")),
            ProtocolError::StaleRoot
        );
        assert_eq!(
            classify(LedgerError::revert_reason("Only owner can call this")),
            ProtocolError::NotAuthorized
        );
        assert!(matches!(
            classify(LedgerError::revert_reason(
                "Cannot submit proposals to an active election"
            )),
            ProtocolError::ProposalWindowClosed(_)
        ));
    }

    #[test]
    fn test_unknown_revert_keeps_raw_detail() {
        let classified = classify(LedgerError::Reverted {
            selector: Some("0xdeadbeef".to_string()),
            reason: None,
        });
        assert_eq!(
            classified,
            ProtocolError::UnclassifiedContract {
                selector: Some("0xdeadbeef".to_string()),
                reason: None,
            }
        );
    }

    #[test]
    fn test_transport_errors() {
        assert!(matches!(
            classify(LedgerError::Unavailable("connection refused".to_string())),
            ProtocolError::LedgerUnavailable(_)
        ));
        assert!(matches!(
            classify(LedgerError::Timeout),
            ProtocolError::LedgerUnavailable(_)
        ));
    }

    #[test]
    fn test_member_exists_detection() {
        assert!(is_member_exists(&LedgerError::revert_reason(
            "Identity commitment already exists in the group"
        )));
        assert!(!is_member_exists(&LedgerError::revert_reason(
            "Only owner"
        )));
        assert!(!is_member_exists(&LedgerError::Timeout));
    }
}
