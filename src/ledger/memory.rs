// In-memory ledger
// Full in-process simulation of the election contract plus membership
// groups: nonce ordering, nullifier bookkeeping, root-expiry window, and
// the lifecycle guards the real contract enforces. Used by the dev node
// and by tests; failure scripting mirrors what a flaky chain can do.

use super::traits::{LedgerClient, LedgerError};
use super::types::{PendingTx, TxReceipt, Uint256, WriteCall};
use crate::clock::{Clock, SystemClock};
use crate::election::{
    winning_index, Election, ElectionSpec, ElectionStateError, PendingProposal, Proposal,
};
use crate::ledger::revert::{
    SELECTOR_DUPLICATE_NULLIFIER, SELECTOR_INVALID_PROOF, SELECTOR_UNKNOWN_ROOT,
};
use async_trait::async_trait;
use rand::RngCore;
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Default number of historic merkle roots a group still accepts
pub const DEFAULT_ROOT_HISTORY_SIZE: usize = 8;

const BASE_GAS: u64 = 21_000;

// ============================================================================
// LEDGER STATE
// ============================================================================

struct ElectionRecord {
    election: Election,
    proposals: Vec<Proposal>,
    pending: Vec<PendingProposal>,
    next_pending_id: u64,
    used_nullifiers: HashSet<Uint256>,
}

struct GroupRecord {
    members: Vec<Uint256>,
    /// Current root is the back; older roots age out of the window
    root_history: VecDeque<Uint256>,
}

impl GroupRecord {
    fn new() -> Self {
        let mut root_history = VecDeque::new();
        root_history.push_back(Uint256::ZERO);
        Self {
            members: Vec::new(),
            root_history,
        }
    }

    fn current_root(&self) -> Uint256 {
        *self.root_history.back().unwrap_or(&Uint256::ZERO)
    }

    fn accepts_root(&self, root: &Uint256) -> bool {
        self.root_history.contains(root)
    }

    fn add_member(&mut self, commitment: Uint256, history_size: usize) {
        self.members.push(commitment);

        // Simulated incremental tree: the root fingerprints the ordered
        // member list.
        let mut hasher = Keccak256::new();
        for member in &self.members {
            hasher.update(member.as_bytes());
        }
        let mut root = [0u8; 32];
        root.copy_from_slice(&hasher.finalize());
        self.root_history.push_back(Uint256::from_bytes(root));

        while self.root_history.len() > history_size {
            self.root_history.pop_front();
        }
    }
}

#[derive(Default)]
struct Scripting {
    nonce_conflicts_remaining: usize,
    next_revert: Option<LedgerError>,
    unavailable: bool,
    reject_proofs: bool,
}

struct Inner {
    elections: Vec<ElectionRecord>,
    next_election_id: u64,
    groups: Vec<GroupRecord>,
    root_history_size: usize,
    chain_nonce: u64,
    block_number: u64,
    pending: HashMap<Uint256, Result<TxReceipt, LedgerError>>,
    /// Function names of writes that actually executed, in order
    write_log: Vec<&'static str>,
    send_attempts: u64,
    script: Scripting,
}

// ============================================================================
// IN-MEMORY LEDGER
// ============================================================================

/// In-process election ledger with contract-faithful semantics
pub struct InMemoryLedger {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl InMemoryLedger {
    /// Create a ledger with one empty membership group and no elections
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create a ledger driven by the given clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                elections: Vec::new(),
                next_election_id: 0,
                groups: vec![GroupRecord::new()],
                root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
                chain_nonce: 0,
                block_number: 0,
                pending: HashMap::new(),
                write_log: Vec::new(),
                send_attempts: 0,
                script: Scripting::default(),
            }),
            clock,
        }
    }

    /// Shrink or grow the accepted-root window
    pub fn set_root_history_size(&self, size: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.root_history_size = size.max(1);
    }

    /// Seed an election directly, bypassing the transaction path
    pub fn seed_election(&self, spec: &ElectionSpec) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let election_id = inner.next_election_id;
        inner.next_election_id += 1;
        inner.elections.push(ElectionRecord {
            election: Election::new(
                election_id,
                spec.name(),
                spec.city_area(),
                spec.start_time(),
                spec.end_time(),
            ),
            proposals: spec.initial_proposals(),
            pending: Vec::new(),
            next_pending_id: 0,
            used_nullifiers: HashSet::new(),
        });
        election_id
    }

    // ------------------------------------------------------------------
    // Failure scripting
    // ------------------------------------------------------------------

    /// Make the next `count` sends fail with a sequence-number conflict
    pub fn script_nonce_conflicts(&self, count: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.script.nonce_conflicts_remaining = count;
    }

    /// Make the next write mine as the given revert
    pub fn script_revert(&self, error: LedgerError) {
        let mut inner = self.inner.lock().unwrap();
        inner.script.next_revert = Some(error);
    }

    /// Toggle a simulated full outage
    pub fn set_unavailable(&self, unavailable: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.script.unavailable = unavailable;
    }

    /// Reject every proof as cryptographically invalid
    pub fn set_reject_proofs(&self, reject: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.script.reject_proofs = reject;
    }

    // ------------------------------------------------------------------
    // Test observability
    // ------------------------------------------------------------------

    /// Function names of the writes that executed, in order
    pub fn write_log(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.write_log.iter().map(|s| s.to_string()).collect()
    }

    /// Total send attempts, including rejected ones
    pub fn send_attempts(&self) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.send_attempts
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    fn check_available(inner: &Inner) -> Result<(), LedgerError> {
        if inner.script.unavailable {
            return Err(LedgerError::Unavailable("scripted outage".to_string()));
        }
        Ok(())
    }

    fn record_mut<'a>(
        inner: &'a mut Inner,
        election_id: u64,
    ) -> Result<&'a mut ElectionRecord, LedgerError> {
        inner
            .elections
            .iter_mut()
            .find(|record| record.election.election_id() == election_id)
            .ok_or_else(|| LedgerError::NotFound(format!("Election {} does not exist", election_id)))
    }

    fn record<'a>(inner: &'a Inner, election_id: u64) -> Result<&'a ElectionRecord, LedgerError> {
        inner
            .elections
            .iter()
            .find(|record| record.election.election_id() == election_id)
            .ok_or_else(|| LedgerError::NotFound(format!("Election {} does not exist", election_id)))
    }

    fn state_revert(error: ElectionStateError) -> LedgerError {
        LedgerError::revert_reason(&error.to_string())
    }

    /// Apply a write call to the ledger state
    fn execute(inner: &mut Inner, call: &WriteCall, now: u64) -> Result<(), LedgerError> {
        match call {
            WriteCall::AddMember { commitment } => {
                let history_size = inner.root_history_size;
                let group = inner.groups.last_mut().ok_or_else(|| {
                    LedgerError::NotFound("No membership group exists".to_string())
                })?;
                if group.members.contains(commitment) {
                    return Err(LedgerError::revert_reason(
                        "Identity commitment already exists in the group",
                    ));
                }
                group.add_member(*commitment, history_size);
                Ok(())
            }

            WriteCall::Vote {
                election_id,
                proposal_index,
                group_id,
                merkle_root,
                nullifier_hash,
                proof,
            } => {
                let reject_proofs = inner.script.reject_proofs;
                let group = inner
                    .groups
                    .get(*group_id as usize)
                    .ok_or_else(|| LedgerError::NotFound(format!("Group {} does not exist", group_id)))?;
                if !group.accepts_root(merkle_root) {
                    return Err(LedgerError::revert_selector(SELECTOR_UNKNOWN_ROOT));
                }

                let record = Self::record_mut(inner, *election_id)?;
                if !record.election.active() || record.election.finalized() {
                    return Err(LedgerError::revert_reason("Election is not active"));
                }
                if *proposal_index as usize >= record.proposals.len() {
                    return Err(LedgerError::revert_reason("Invalid proposal index"));
                }
                if record.used_nullifiers.contains(nullifier_hash) {
                    return Err(LedgerError::revert_selector(SELECTOR_DUPLICATE_NULLIFIER));
                }
                if reject_proofs || proof.is_zero() {
                    return Err(LedgerError::revert_selector(SELECTOR_INVALID_PROOF));
                }

                record.used_nullifiers.insert(*nullifier_hash);
                record.proposals[*proposal_index as usize].record_vote();
                Ok(())
            }

            WriteCall::StartElection { election_id } => {
                let record = Self::record_mut(inner, *election_id)?;
                record.election.activate().map_err(Self::state_revert)
            }

            WriteCall::FinalizeElection { election_id } => {
                let record = Self::record_mut(inner, *election_id)?;
                record.election.finalize().map_err(Self::state_revert)?;

                let counts: Vec<u64> = record.proposals.iter().map(Proposal::vote_count).collect();
                if let Some(winner) = winning_index(&counts) {
                    record.proposals[winner].set_winning(true);
                }
                Ok(())
            }

            WriteCall::CreateElection { spec } => {
                spec.validate()
                    .map_err(|e| LedgerError::revert_reason(&e.to_string()))?;
                let election_id = inner.next_election_id;
                inner.next_election_id += 1;
                inner.elections.push(ElectionRecord {
                    election: Election::new(
                        election_id,
                        spec.name(),
                        spec.city_area(),
                        spec.start_time(),
                        spec.end_time(),
                    ),
                    proposals: spec.initial_proposals(),
                    pending: Vec::new(),
                    next_pending_id: 0,
                    used_nullifiers: HashSet::new(),
                });
                Ok(())
            }

            WriteCall::UpdateElection { election_id, spec } => {
                spec.validate()
                    .map_err(|e| LedgerError::revert_reason(&e.to_string()))?;
                let record = Self::record_mut(inner, *election_id)?;
                record.election.apply_spec(spec).map_err(Self::state_revert)?;
                record.proposals = spec.initial_proposals();
                Ok(())
            }

            WriteCall::DeleteElection { election_id } => {
                let record = Self::record(inner, *election_id)?;
                if !record.election.is_mutable() {
                    return Err(Self::state_revert(ElectionStateError::Immutable));
                }
                inner
                    .elections
                    .retain(|record| record.election.election_id() != *election_id);
                Ok(())
            }

            WriteCall::SubmitProposal {
                election_id,
                data_cid,
                image_cid,
            } => {
                let record = Self::record_mut(inner, *election_id)?;
                if record.election.active() {
                    return Err(LedgerError::revert_reason(
                        "Cannot submit proposals to an active election",
                    ));
                }
                if record.election.finalized() {
                    return Err(LedgerError::revert_reason(
                        "Cannot submit proposals to a finalized election",
                    ));
                }
                if now >= record.election.start_time() {
                    return Err(LedgerError::revert_reason(
                        "Cannot submit proposals after election start time",
                    ));
                }
                let proposal_id = record.next_pending_id;
                record.next_pending_id += 1;
                record
                    .pending
                    .push(PendingProposal::new(proposal_id, data_cid, image_cid, now));
                Ok(())
            }

            WriteCall::AcceptProposal {
                election_id,
                proposal_id,
            } => {
                let record = Self::record_mut(inner, *election_id)?;
                if !record.election.is_mutable() {
                    return Err(LedgerError::revert_reason(
                        "Cannot accept proposals once the election is active or finalized",
                    ));
                }
                let pending = record
                    .pending
                    .iter_mut()
                    .find(|p| p.proposal_id() == *proposal_id)
                    .ok_or_else(|| {
                        LedgerError::NotFound(format!("Pending proposal {} does not exist", proposal_id))
                    })?;
                if pending.processed() {
                    return Err(LedgerError::revert_reason("Proposal already processed"));
                }
                pending.mark_processed();
                let proposal = Proposal::new(pending.data_cid(), pending.image_cid());
                record.proposals.push(proposal);
                Ok(())
            }

            WriteCall::DeclineProposal {
                election_id,
                proposal_id,
            } => {
                let record = Self::record_mut(inner, *election_id)?;
                let pending = record
                    .pending
                    .iter_mut()
                    .find(|p| p.proposal_id() == *proposal_id)
                    .ok_or_else(|| {
                        LedgerError::NotFound(format!("Pending proposal {} does not exist", proposal_id))
                    })?;
                if pending.processed() {
                    return Err(LedgerError::revert_reason("Proposal already processed"));
                }
                pending.mark_processed();
                Ok(())
            }
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn get_all_elections(&self) -> Result<Vec<Election>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        Ok(inner
            .elections
            .iter()
            .map(|record| record.election.clone())
            .collect())
    }

    async fn get_election(&self, election_id: u64) -> Result<Election, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        Ok(Self::record(&inner, election_id)?.election.clone())
    }

    async fn get_proposals(&self, election_id: u64) -> Result<Vec<Proposal>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        Ok(Self::record(&inner, election_id)?.proposals.clone())
    }

    async fn check_votes(&self, election_id: u64) -> Result<Vec<u64>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        Ok(Self::record(&inner, election_id)?
            .proposals
            .iter()
            .map(Proposal::vote_count)
            .collect())
    }

    async fn get_pending_proposals(
        &self,
        election_id: u64,
    ) -> Result<Vec<PendingProposal>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        Ok(Self::record(&inner, election_id)?
            .pending
            .iter()
            .filter(|p| !p.processed())
            .cloned()
            .collect())
    }

    async fn group_members(&self, group_id: u64) -> Result<Vec<Uint256>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        inner
            .groups
            .get(group_id as usize)
            .map(|group| group.members.clone())
            .ok_or_else(|| LedgerError::NotFound(format!("Group {} does not exist", group_id)))
    }

    async fn merkle_root(&self, group_id: u64) -> Result<Uint256, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        inner
            .groups
            .get(group_id as usize)
            .map(GroupRecord::current_root)
            .ok_or_else(|| LedgerError::NotFound(format!("Group {} does not exist", group_id)))
    }

    async fn current_group_id(&self) -> Result<u64, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        Ok(inner.groups.len() as u64 - 1)
    }

    async fn transaction_count(&self) -> Result<u64, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        Ok(inner.chain_nonce)
    }

    async fn send(&self, call: &WriteCall, nonce: u64) -> Result<PendingTx, LedgerError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        inner.send_attempts += 1;

        if inner.script.nonce_conflicts_remaining > 0 {
            inner.script.nonce_conflicts_remaining -= 1;
            return Err(LedgerError::NonceConflict(
                "nonce has already been used".to_string(),
            ));
        }
        if nonce != inner.chain_nonce {
            return Err(LedgerError::NonceConflict(format!(
                "nonce too low: expected {}, got {}",
                inner.chain_nonce, nonce
            )));
        }

        // The write is accepted into a block from here on: it consumes
        // the nonce even if it reverts.
        inner.chain_nonce += 1;
        inner.block_number += 1;

        let mut hash_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut hash_bytes);
        let tx_hash = Uint256::from_bytes(hash_bytes);

        let outcome = if let Some(revert) = inner.script.next_revert.take() {
            Err(revert)
        } else {
            match Self::execute(&mut inner, call, now) {
                Ok(()) => {
                    inner.write_log.push(call.function_name());
                    let block_number = inner.block_number;
                    let gas_used = BASE_GAS + (call.function_name().len() as u64) * 100;
                    Ok(TxReceipt::new(tx_hash, block_number, gas_used))
                }
                Err(error) => Err(error),
            }
        };

        inner.pending.insert(tx_hash, outcome);
        Ok(PendingTx::new(tx_hash, nonce))
    }

    async fn await_mined(&self, pending: PendingTx) -> Result<TxReceipt, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        inner
            .pending
            .remove(&pending.tx_hash())
            .unwrap_or_else(|| {
                Err(LedgerError::NotFound(format!(
                    "Unknown transaction {}",
                    pending.tx_hash()
                )))
            })
    }
}
