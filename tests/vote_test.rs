// Vote Admission Tests
// Nullifier uniqueness, root expiry, proof rejection, and the receipt
// path, all against the in-memory ledger's own bookkeeping.

use civicpoll::clock::ManualClock;
use civicpoll::election::ElectionSpec;
use civicpoll::error::ProtocolError;
use civicpoll::ledger::{InMemoryLedger, LedgerClient, Proof, Uint256, WriteCall};
use civicpoll::submitter::{SubmitterConfig, TxSubmitter};
use civicpoll::vote::{VoteRelay, VoteRequest};
use std::sync::Arc;

struct Fixture {
    ledger: Arc<InMemoryLedger>,
    relay: VoteRelay<InMemoryLedger>,
    submitter: Arc<TxSubmitter<InMemoryLedger>>,
    election_id: u64,
}

fn test_proof() -> Proof {
    let mut limbs = [Uint256::ZERO; 8];
    for (i, limb) in limbs.iter_mut().enumerate() {
        *limb = Uint256::from_u64(i as u64 + 1);
    }
    Proof::from_limbs(limbs)
}

/// Ledger with one active two-proposal election and one group member
async fn new_fixture() -> Fixture {
    let clock = Arc::new(ManualClock::at(1500));
    let ledger = Arc::new(InMemoryLedger::with_clock(clock));
    let submitter = Arc::new(TxSubmitter::new(ledger.clone(), SubmitterConfig::default()));

    let election_id = ledger.seed_election(
        &ElectionSpec::new("Park renewal", "North", 1000, 2000)
            .with_proposal("data-a", "image-a")
            .with_proposal("data-b", "image-b"),
    );
    submitter
        .submit(&WriteCall::StartElection { election_id })
        .await
        .unwrap();
    submitter
        .submit(&WriteCall::AddMember {
            commitment: Uint256::from_u64(42),
        })
        .await
        .unwrap();

    let relay = VoteRelay::new(ledger.clone(), submitter.clone());
    Fixture {
        ledger,
        relay,
        submitter,
        election_id,
    }
}

impl Fixture {
    async fn current_root(&self) -> Uint256 {
        self.ledger.merkle_root(0).await.unwrap()
    }

    fn request(&self, proposal_index: u64, root: Uint256, nullifier: u64) -> VoteRequest {
        VoteRequest::new(
            self.election_id,
            proposal_index,
            0,
            root,
            Uint256::from_u64(nullifier),
            test_proof(),
        )
    }
}

// ============================================================================
// ADMISSION
// ============================================================================

#[tokio::test]
async fn test_vote_success_returns_receipt() {
    let fixture = new_fixture().await;
    let root = fixture.current_root().await;

    let receipt = fixture
        .relay
        .vote(fixture.request(0, root, 777))
        .await
        .unwrap();
    assert!(receipt.block_number() > 0);
    assert!(receipt.gas_used() > 0);
    assert!(!receipt.tx_hash().is_zero());

    assert_eq!(
        fixture.ledger.check_votes(fixture.election_id).await.unwrap(),
        vec![1, 0]
    );
}

#[tokio::test]
async fn test_nullifier_accepted_exactly_once() {
    let fixture = new_fixture().await;
    let root = fixture.current_root().await;

    fixture
        .relay
        .vote(fixture.request(0, root, 777))
        .await
        .unwrap();

    // Same nullifier again, even on a different proposal
    let second = fixture.relay.vote(fixture.request(1, root, 777)).await;
    assert_eq!(second, Err(ProtocolError::DuplicateVote));

    // Exactly one increment happened
    assert_eq!(
        fixture.ledger.check_votes(fixture.election_id).await.unwrap(),
        vec![1, 0]
    );

    // A different nullifier is fine
    fixture
        .relay
        .vote(fixture.request(1, root, 778))
        .await
        .unwrap();
    assert_eq!(
        fixture.ledger.check_votes(fixture.election_id).await.unwrap(),
        vec![1, 1]
    );
}

#[tokio::test]
async fn test_expired_root_rejected() {
    let fixture = new_fixture().await;
    fixture.ledger.set_root_history_size(1);

    let old_root = fixture.current_root().await;

    // New members rotate the root; with a window of one, the old root
    // has aged out even though the proof itself is fine
    fixture
        .submitter
        .submit(&WriteCall::AddMember {
            commitment: Uint256::from_u64(43),
        })
        .await
        .unwrap();

    let stale = fixture.relay.vote(fixture.request(0, old_root, 777)).await;
    assert_eq!(stale, Err(ProtocolError::StaleRoot));

    // Refetching the current root and resubmitting succeeds
    let fresh_root = fixture.current_root().await;
    fixture
        .relay
        .vote(fixture.request(0, fresh_root, 777))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_recent_root_still_in_window() {
    let fixture = new_fixture().await;
    let previous_root = fixture.current_root().await;

    // One rotation, default window: the previous root is still accepted
    fixture
        .submitter
        .submit(&WriteCall::AddMember {
            commitment: Uint256::from_u64(43),
        })
        .await
        .unwrap();

    fixture
        .relay
        .vote(fixture.request(0, previous_root, 777))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_invalid_proof_rejected() {
    let fixture = new_fixture().await;
    let root = fixture.current_root().await;

    fixture.ledger.set_reject_proofs(true);
    let result = fixture.relay.vote(fixture.request(0, root, 777)).await;
    assert_eq!(result, Err(ProtocolError::InvalidProof));

    // The nullifier was not consumed by the failed attempt
    fixture.ledger.set_reject_proofs(false);
    fixture
        .relay
        .vote(fixture.request(0, root, 777))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_request_shape_validation() {
    let fixture = new_fixture().await;
    let root = fixture.current_root().await;

    let zero_nullifier = VoteRequest::new(
        fixture.election_id,
        0,
        0,
        root,
        Uint256::ZERO,
        test_proof(),
    );
    assert!(matches!(
        fixture.relay.vote(zero_nullifier).await,
        Err(ProtocolError::InvalidRequest(_))
    ));

    let zero_root = VoteRequest::new(
        fixture.election_id,
        0,
        0,
        Uint256::ZERO,
        Uint256::from_u64(777),
        test_proof(),
    );
    assert!(matches!(
        fixture.relay.vote(zero_root).await,
        Err(ProtocolError::InvalidRequest(_))
    ));

    // Proposal index out of range
    assert!(matches!(
        fixture.relay.vote(fixture.request(9, root, 777)).await,
        Err(ProtocolError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn test_vote_on_closed_election_rejected() {
    let fixture = new_fixture().await;
    let root = fixture.current_root().await;

    fixture
        .submitter
        .submit(&WriteCall::FinalizeElection {
            election_id: fixture.election_id,
        })
        .await
        .unwrap();

    let result = fixture.relay.vote(fixture.request(0, root, 777)).await;
    assert!(matches!(result, Err(ProtocolError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_ledger_outage_classified() {
    let fixture = new_fixture().await;
    let root = fixture.current_root().await;
    let request = fixture.request(0, root, 777);

    fixture.ledger.set_unavailable(true);
    let result = fixture.relay.vote(request).await;
    assert!(matches!(result, Err(ProtocolError::LedgerUnavailable(_))));
}

#[tokio::test]
async fn test_nonce_exhaustion_surfaces_to_caller() {
    let fixture = new_fixture().await;
    let root = fixture.current_root().await;
    let request = fixture.request(0, root, 777);

    fixture.ledger.script_nonce_conflicts(10);
    let result = fixture.relay.vote(request).await;
    assert_eq!(result, Err(ProtocolError::NonceExhausted { attempts: 3 }));
}
