// Vote admission
// Validates an incoming vote request's shape and freshness, relays it to
// the ledger through the submitter, and translates every ledger failure
// into the protocol taxonomy. The relay never does its own nullifier
// bookkeeping; the ledger's record is the sole source of truth.

use crate::error::ProtocolError;
use crate::ledger::{classify, LedgerClient, Proof, TxReceipt, Uint256, WriteCall};
use crate::submitter::TxSubmitter;
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// VOTE REQUEST
// ============================================================================

/// An anonymous vote as received from a caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteRequest {
    election_id: u64,
    proposal_index: u64,
    group_id: u64,
    merkle_root: Uint256,
    nullifier_hash: Uint256,
    proof: Proof,
}

impl VoteRequest {
    /// Create a new vote request
    pub fn new(
        election_id: u64,
        proposal_index: u64,
        group_id: u64,
        merkle_root: Uint256,
        nullifier_hash: Uint256,
        proof: Proof,
    ) -> Self {
        Self {
            election_id,
            proposal_index,
            group_id,
            merkle_root,
            nullifier_hash,
            proof,
        }
    }

    /// Get the election ID
    pub fn election_id(&self) -> u64 {
        self.election_id
    }

    /// Get the proposal index
    pub fn proposal_index(&self) -> u64 {
        self.proposal_index
    }

    /// Get the membership group ID
    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    /// Get the merkle root the proof was generated against
    pub fn merkle_root(&self) -> Uint256 {
        self.merkle_root
    }

    /// Get the nullifier hash
    pub fn nullifier_hash(&self) -> Uint256 {
        self.nullifier_hash
    }

    /// Get the proof
    pub fn proof(&self) -> &Proof {
        &self.proof
    }

    /// Check the request's shape before any ledger call
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.merkle_root.is_zero() {
            return Err(ProtocolError::InvalidRequest(
                "merkle root cannot be zero".to_string(),
            ));
        }
        if self.nullifier_hash.is_zero() {
            return Err(ProtocolError::InvalidRequest(
                "nullifier hash cannot be zero".to_string(),
            ));
        }
        Ok(())
    }

    fn into_write_call(self) -> WriteCall {
        WriteCall::Vote {
            election_id: self.election_id,
            proposal_index: self.proposal_index,
            group_id: self.group_id,
            merkle_root: self.merkle_root,
            nullifier_hash: self.nullifier_hash,
            proof: self.proof,
        }
    }
}

// ============================================================================
// VOTE RELAY
// ============================================================================

/// Vote admission protocol
pub struct VoteRelay<C: LedgerClient> {
    client: Arc<C>,
    submitter: Arc<TxSubmitter<C>>,
}

impl<C: LedgerClient> VoteRelay<C> {
    /// Create a new relay
    pub fn new(client: Arc<C>, submitter: Arc<TxSubmitter<C>>) -> Self {
        Self { client, submitter }
    }

    /// Admit and relay one vote
    ///
    /// On success the target proposal's counter has been incremented by
    /// exactly one, enforced by the ledger's nullifier record. Failures
    /// come back as exactly one taxonomy entry; raw ledger codes never
    /// cross this boundary.
    pub async fn vote(&self, request: VoteRequest) -> Result<TxReceipt, ProtocolError> {
        request.validate()?;

        let election_id = request.election_id();
        info!(
            election_id,
            proposal_index = request.proposal_index(),
            group_id = request.group_id(),
            nullifier = %request.nullifier_hash(),
            merkle_root = %request.merkle_root(),
            "processing vote"
        );

        // Freshness checks against current ledger state, not a cache
        let election = self
            .client
            .get_election(election_id)
            .await
            .map_err(classify)?;
        if !election.active() || election.finalized() {
            return Err(ProtocolError::InvalidRequest(format!(
                "election {} is not open for voting",
                election_id
            )));
        }

        let proposals = self
            .client
            .get_proposals(election_id)
            .await
            .map_err(classify)?;
        if request.proposal_index() as usize >= proposals.len() {
            return Err(ProtocolError::InvalidRequest(format!(
                "proposal index {} out of range",
                request.proposal_index()
            )));
        }

        match self.submitter.submit(&request.into_write_call()).await {
            Ok(receipt) => {
                info!(
                    election_id,
                    tx_hash = %receipt.tx_hash(),
                    block = receipt.block_number(),
                    gas_used = receipt.gas_used(),
                    "vote admitted"
                );
                Ok(receipt)
            }
            Err(err) => {
                let classified = ProtocolError::from(err);
                match &classified {
                    ProtocolError::DuplicateVote => {
                        warn!(election_id, "duplicate vote attempt")
                    }
                    ProtocolError::StaleRoot => {
                        warn!(election_id, "vote used an unknown or expired merkle root")
                    }
                    ProtocolError::InvalidProof => {
                        warn!(election_id, "vote proof failed verification")
                    }
                    other => warn!(election_id, error = %other, "vote rejected"),
                }
                Err(classified)
            }
        }
    }
}
