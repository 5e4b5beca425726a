// Proof-input contract
// The core never generates or verifies proofs, but it pins down the
// exact inputs the external prover must use so that proofs verify
// against the ledger: scope, message, member list, and tree depth have
// to match bit-for-bit on both sides.

use crate::ledger::{Proof, Uint256};
use async_trait::async_trait;
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Merkle tree depth shared by the prover and the ledger's verifier.
/// A depth mismatch fails verification indistinguishably from an
/// invalid proof.
pub const MERKLE_TREE_DEPTH: u32 = 20;

/// Errors from proof generation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("Identity commitment is not a member of the anonymity set")]
    NotAMember,

    #[error("Prover failed: {0}")]
    Prover(String),
}

/// The message value bound into a vote proof
///
/// Keccak-256 of the proposal index encoded as a 32-byte big-endian
/// unsigned integer, interpreted as a big-endian 256-bit value.
pub fn vote_message(proposal_index: u64) -> Uint256 {
    let encoded = Uint256::from_u64(proposal_index);
    let digest = Keccak256::digest(encoded.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Uint256::from_bytes(bytes)
}

// ============================================================================
// PROOF INPUTS
// ============================================================================

/// Public inputs for generating a vote proof
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofInputs {
    scope: u64,
    message: Uint256,
    members: Vec<Uint256>,
    tree_depth: u32,
}

impl ProofInputs {
    /// Build the inputs for a vote on one proposal
    ///
    /// `members` must be the full, current commitment list of the target
    /// group, in ledger order.
    pub fn for_vote(election_id: u64, proposal_index: u64, members: Vec<Uint256>) -> Self {
        Self {
            // The scope is the election id as an integer, not re-encoded
            scope: election_id,
            message: vote_message(proposal_index),
            members,
            tree_depth: MERKLE_TREE_DEPTH,
        }
    }

    /// Get the scope (election id)
    pub fn scope(&self) -> u64 {
        self.scope
    }

    /// Get the message value
    pub fn message(&self) -> Uint256 {
        self.message
    }

    /// Get the anonymity-set member list
    pub fn members(&self) -> &[Uint256] {
        &self.members
    }

    /// Get the merkle tree depth
    pub fn tree_depth(&self) -> u32 {
        self.tree_depth
    }
}

/// A generated proof plus its public nullifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofBundle {
    pub proof: Proof,
    pub nullifier: Uint256,
}

/// External proof subsystem
///
/// Given a private identity and the public inputs, deterministically
/// produces a proof the ledger can verify plus the public nullifier for
/// the scope.
#[async_trait]
pub trait ProofSystem: Send + Sync {
    async fn prove(
        &self,
        identity_secret: &[u8],
        inputs: &ProofInputs,
    ) -> Result<ProofBundle, ProofError>;
}
