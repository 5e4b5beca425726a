// Core chain types
// 256-bit field values, proofs, transaction handles, and the typed write
// calls accepted by the election ledger contract.

use crate::election::ElectionSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from parsing a 256-bit value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Uint256Error {
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Value longer than 256 bits")]
    Overflow,
}

// ============================================================================
// UINT256
// ============================================================================

/// Opaque 256-bit unsigned value, big-endian
///
/// Used for identity commitments, merkle roots, nullifier hashes, proof
/// limbs, and transaction hashes. The core never does field arithmetic on
/// these; it only moves them between the caller and the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uint256([u8; 32]);

impl Uint256 {
    /// The zero value
    pub const ZERO: Uint256 = Uint256([0u8; 32]);

    /// Create from raw big-endian bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw big-endian bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from a u64 (right-aligned, big-endian)
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Parse from a hex string, with or without a `0x` prefix.
    /// Shorter values are left-padded with zeros.
    pub fn from_hex(hex_str: &str) -> Result<Self, Uint256Error> {
        let trimmed = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        if trimmed.len() > 64 {
            return Err(Uint256Error::Overflow);
        }
        // Left-pad odd or short inputs to a full 32 bytes
        let padded = format!("{:0>64}", trimmed);
        let decoded = hex::decode(&padded)
            .map_err(|e| Uint256Error::InvalidHex(e.to_string()))?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    /// Render as a `0x`-prefixed lowercase hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Whether the value is zero
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ============================================================================
// PROOF
// ============================================================================

/// A zero-knowledge membership proof as submitted to the ledger
///
/// Eight field elements, exactly as the ledger's verifier expects them.
/// The core treats the contents as opaque.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof([Uint256; 8]);

impl Proof {
    /// Create from the eight proof limbs
    pub fn from_limbs(limbs: [Uint256; 8]) -> Self {
        Self(limbs)
    }

    /// Get the proof limbs
    pub fn limbs(&self) -> &[Uint256; 8] {
        &self.0
    }

    /// Whether every limb is zero (no real prover emits this)
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(Uint256::is_zero)
    }
}

// ============================================================================
// TRANSACTION HANDLES
// ============================================================================

/// Handle for a write that has been sent but not yet mined
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    tx_hash: Uint256,
    nonce: u64,
}

impl PendingTx {
    /// Create a new pending transaction handle
    pub fn new(tx_hash: Uint256, nonce: u64) -> Self {
        Self { tx_hash, nonce }
    }

    /// Get the transaction hash
    pub fn tx_hash(&self) -> Uint256 {
        self.tx_hash
    }

    /// Get the sequence number the write was sent with
    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}

/// Receipt for a mined write
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    tx_hash: Uint256,
    block_number: u64,
    gas_used: u64,
}

impl TxReceipt {
    /// Create a new receipt
    pub fn new(tx_hash: Uint256, block_number: u64, gas_used: u64) -> Self {
        Self {
            tx_hash,
            block_number,
            gas_used,
        }
    }

    /// Get the transaction hash
    pub fn tx_hash(&self) -> Uint256 {
        self.tx_hash
    }

    /// Get the block number the write was mined in
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Get the gas used
    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }
}

// ============================================================================
// WRITE CALLS
// ============================================================================

/// A typed write to the election ledger contract
///
/// Every write from the operator identity is one of these; the submitter
/// attaches the sequence number and the gateway does the sending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteCall {
    /// Add an identity commitment to the current membership group
    AddMember { commitment: Uint256 },

    /// Cast an anonymous vote
    Vote {
        election_id: u64,
        proposal_index: u64,
        group_id: u64,
        merkle_root: Uint256,
        nullifier_hash: Uint256,
        proof: Proof,
    },

    /// Scheduled -> Active transition
    StartElection { election_id: u64 },

    /// -> Finalized transition (terminal)
    FinalizeElection { election_id: u64 },

    /// Create a new election from an administrator spec
    CreateElection { spec: ElectionSpec },

    /// Update an election that is neither active nor finalized
    UpdateElection { election_id: u64, spec: ElectionSpec },

    /// Delete an election that is neither active nor finalized
    DeleteElection { election_id: u64 },

    /// Submit a proposal for admin review before the election starts
    SubmitProposal {
        election_id: u64,
        data_cid: String,
        image_cid: String,
    },

    /// Accept a pending proposal into the election
    AcceptProposal { election_id: u64, proposal_id: u64 },

    /// Decline a pending proposal
    DeclineProposal { election_id: u64, proposal_id: u64 },
}

impl WriteCall {
    /// Contract function name, for logging
    pub fn function_name(&self) -> &'static str {
        match self {
            WriteCall::AddMember { .. } => "addMember",
            WriteCall::Vote { .. } => "vote",
            WriteCall::StartElection { .. } => "startElection",
            WriteCall::FinalizeElection { .. } => "finalizeElection",
            WriteCall::CreateElection { .. } => "createElection",
            WriteCall::UpdateElection { .. } => "updateElection",
            WriteCall::DeleteElection { .. } => "deleteElection",
            WriteCall::SubmitProposal { .. } => "submitProposal",
            WriteCall::AcceptProposal { .. } => "acceptProposal",
            WriteCall::DeclineProposal { .. } => "declineProposal",
        }
    }
}
