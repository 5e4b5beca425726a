// Election data model
// Ledger-resident election rows, proposals, pending proposals, and the
// pure lifecycle guard functions used by the monitor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from illegal lifecycle state changes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElectionStateError {
    #[error("Election already active")]
    AlreadyActive,

    #[error("Election already finalized")]
    AlreadyFinalized,

    #[error("Election cannot be modified once active or finalized")]
    Immutable,
}

// ============================================================================
// ELECTION
// ============================================================================

/// A ledger-resident election
///
/// Lifecycle is `Scheduled -> Active -> Finalized`, never reversed.
/// `active` and `finalized` are written only through `activate` and
/// `finalize`; every other path treats them as read-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    election_id: u64,
    name: String,
    city_area: String,
    start_time: u64,
    end_time: u64,
    active: bool,
    finalized: bool,
}

impl Election {
    /// Create a new scheduled election
    pub fn new(election_id: u64, name: &str, city_area: &str, start_time: u64, end_time: u64) -> Self {
        Self {
            election_id,
            name: name.to_string(),
            city_area: city_area.to_string(),
            start_time,
            end_time,
            active: false,
            finalized: false,
        }
    }

    /// Get the election ID
    pub fn election_id(&self) -> u64 {
        self.election_id
    }

    /// Get the election name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the city area label
    pub fn city_area(&self) -> &str {
        &self.city_area
    }

    /// Get the start time (Unix seconds)
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Get the end time (Unix seconds)
    pub fn end_time(&self) -> u64 {
        self.end_time
    }

    /// Whether the election is currently active
    pub fn active(&self) -> bool {
        self.active
    }

    /// Whether the election has been finalized
    pub fn finalized(&self) -> bool {
        self.finalized
    }

    /// Whether administrative edits (update, delete) are still allowed
    pub fn is_mutable(&self) -> bool {
        !self.active && !self.finalized
    }

    /// Move Scheduled -> Active
    pub fn activate(&mut self) -> Result<(), ElectionStateError> {
        if self.finalized {
            return Err(ElectionStateError::AlreadyFinalized);
        }
        if self.active {
            return Err(ElectionStateError::AlreadyActive);
        }
        self.active = true;
        Ok(())
    }

    /// Move to Finalized (terminal). Clears `active`.
    pub fn finalize(&mut self) -> Result<(), ElectionStateError> {
        if self.finalized {
            return Err(ElectionStateError::AlreadyFinalized);
        }
        self.active = false;
        self.finalized = true;
        Ok(())
    }

    /// Replace the editable fields from a spec. Only legal while mutable.
    pub fn apply_spec(&mut self, spec: &ElectionSpec) -> Result<(), ElectionStateError> {
        if !self.is_mutable() {
            return Err(ElectionStateError::Immutable);
        }
        self.name = spec.name().to_string();
        self.city_area = spec.city_area().to_string();
        self.start_time = spec.start_time();
        self.end_time = spec.end_time();
        Ok(())
    }
}

// ============================================================================
// LIFECYCLE GUARDS
// ============================================================================

/// Start guard: Scheduled -> Active is due
///
/// True only while `now` is inside the voting window and the election has
/// not already moved on.
pub fn start_due(election: &Election, now: u64) -> bool {
    !election.active()
        && !election.finalized()
        && now >= election.start_time()
        && now < election.end_time()
}

/// Finalize guard: the voting window has closed
///
/// Evaluated regardless of the current `active` value: an election that
/// never activated must still be finalized once its window has passed.
pub fn finalize_due(election: &Election, now: u64) -> bool {
    !election.finalized() && now >= election.end_time()
}

/// Index of the winning proposal given the vote counts
///
/// Ties break to the lowest proposal index. Empty input has no winner.
pub fn winning_index(vote_counts: &[u64]) -> Option<usize> {
    if vote_counts.is_empty() {
        return None;
    }
    let mut winner = 0;
    for (index, &count) in vote_counts.iter().enumerate() {
        if count > vote_counts[winner] {
            winner = index;
        }
    }
    Some(winner)
}

// ============================================================================
// PROPOSAL
// ============================================================================

/// A proposal accepted into an election
///
/// Position in the election's proposal list is its stable index. Content
/// lives in an external content-addressed store; only the CIDs are here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    vote_count: u64,
    winning: bool,
    data_cid: String,
    image_cid: String,
}

impl Proposal {
    /// Create a new proposal with zero votes
    pub fn new(data_cid: &str, image_cid: &str) -> Self {
        Self {
            vote_count: 0,
            winning: false,
            data_cid: data_cid.to_string(),
            image_cid: image_cid.to_string(),
        }
    }

    /// Get the vote count
    pub fn vote_count(&self) -> u64 {
        self.vote_count
    }

    /// Whether this proposal won its election
    pub fn winning(&self) -> bool {
        self.winning
    }

    /// Get the content data CID
    pub fn data_cid(&self) -> &str {
        &self.data_cid
    }

    /// Get the image CID
    pub fn image_cid(&self) -> &str {
        &self.image_cid
    }

    /// Record one admitted vote
    pub fn record_vote(&mut self) {
        self.vote_count += 1;
    }

    /// Set the winning flag at finalization
    pub fn set_winning(&mut self, winning: bool) {
        self.winning = winning;
    }
}

// ============================================================================
// PENDING PROPOSAL
// ============================================================================

/// A proposer-submitted proposal awaiting the administrator's decision
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingProposal {
    proposal_id: u64,
    data_cid: String,
    image_cid: String,
    timestamp: u64,
    processed: bool,
}

impl PendingProposal {
    /// Create a new unprocessed pending proposal
    pub fn new(proposal_id: u64, data_cid: &str, image_cid: &str, timestamp: u64) -> Self {
        Self {
            proposal_id,
            data_cid: data_cid.to_string(),
            image_cid: image_cid.to_string(),
            timestamp,
            processed: false,
        }
    }

    /// Get the pending proposal ID
    pub fn proposal_id(&self) -> u64 {
        self.proposal_id
    }

    /// Get the content data CID
    pub fn data_cid(&self) -> &str {
        &self.data_cid
    }

    /// Get the image CID
    pub fn image_cid(&self) -> &str {
        &self.image_cid
    }

    /// Get the submission timestamp (Unix seconds)
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Whether the administrator has processed this proposal
    pub fn processed(&self) -> bool {
        self.processed
    }

    /// Mark as processed (accepted or declined)
    pub fn mark_processed(&mut self) {
        self.processed = true;
    }
}

// ============================================================================
// ELECTION SPEC
// ============================================================================

/// Administrator input for creating or updating an election
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSpec {
    name: String,
    city_area: String,
    start_time: u64,
    end_time: u64,
    proposal_data_cids: Vec<String>,
    proposal_image_cids: Vec<String>,
}

/// Errors from an invalid election spec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElectionSpecError {
    #[error("Election name cannot be empty")]
    EmptyName,

    #[error("startTime must be strictly before endTime")]
    InvalidWindow,

    #[error("Proposal data and image CID lists must have equal length")]
    MismatchedProposals,
}

impl ElectionSpec {
    /// Create a new spec
    pub fn new(name: &str, city_area: &str, start_time: u64, end_time: u64) -> Self {
        Self {
            name: name.to_string(),
            city_area: city_area.to_string(),
            start_time,
            end_time,
            proposal_data_cids: Vec::new(),
            proposal_image_cids: Vec::new(),
        }
    }

    /// Add an initial proposal by its content CIDs
    pub fn with_proposal(mut self, data_cid: &str, image_cid: &str) -> Self {
        self.proposal_data_cids.push(data_cid.to_string());
        self.proposal_image_cids.push(image_cid.to_string());
        self
    }

    /// Get the election name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the city area label
    pub fn city_area(&self) -> &str {
        &self.city_area
    }

    /// Get the start time (Unix seconds)
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Get the end time (Unix seconds)
    pub fn end_time(&self) -> u64 {
        self.end_time
    }

    /// Get the initial proposal data CIDs
    pub fn proposal_data_cids(&self) -> &[String] {
        &self.proposal_data_cids
    }

    /// Get the initial proposal image CIDs
    pub fn proposal_image_cids(&self) -> &[String] {
        &self.proposal_image_cids
    }

    /// Build the initial proposal list
    pub fn initial_proposals(&self) -> Vec<Proposal> {
        self.proposal_data_cids
            .iter()
            .zip(self.proposal_image_cids.iter())
            .map(|(data, image)| Proposal::new(data, image))
            .collect()
    }

    /// Validate the spec
    pub fn validate(&self) -> Result<(), ElectionSpecError> {
        if self.name.trim().is_empty() {
            return Err(ElectionSpecError::EmptyName);
        }
        if self.start_time >= self.end_time {
            return Err(ElectionSpecError::InvalidWindow);
        }
        if self.proposal_data_cids.len() != self.proposal_image_cids.len() {
            return Err(ElectionSpecError::MismatchedProposals);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_never_reverses() {
        let mut election = Election::new(0, "Park renewal", "North", 100, 200);
        assert!(election.is_mutable());

        election.activate().unwrap();
        assert!(election.active());
        assert_eq!(election.activate(), Err(ElectionStateError::AlreadyActive));

        election.finalize().unwrap();
        assert!(election.finalized());
        assert!(!election.active());
        assert_eq!(election.activate(), Err(ElectionStateError::AlreadyFinalized));
        assert_eq!(election.finalize(), Err(ElectionStateError::AlreadyFinalized));
    }

    #[test]
    fn test_guards() {
        let election = Election::new(0, "Park renewal", "North", 100, 200);

        assert!(!start_due(&election, 99));
        assert!(start_due(&election, 100));
        assert!(start_due(&election, 199));
        assert!(!start_due(&election, 200));

        assert!(!finalize_due(&election, 199));
        assert!(finalize_due(&election, 200));
    }

    #[test]
    fn test_finalize_due_even_if_never_active() {
        // An election whose whole window passed without activating must
        // still be finalized.
        let election = Election::new(3, "Missed", "East", 100, 200);
        assert!(!election.active());
        assert!(finalize_due(&election, 201));
    }

    #[test]
    fn test_winning_index_tie_breaks_low() {
        assert_eq!(winning_index(&[]), None);
        assert_eq!(winning_index(&[0, 0, 0]), Some(0));
        assert_eq!(winning_index(&[1, 3, 2]), Some(1));
        assert_eq!(winning_index(&[2, 3, 3]), Some(1));
    }

    #[test]
    fn test_spec_validation() {
        let spec = ElectionSpec::new("Bike lanes", "Center", 100, 200)
            .with_proposal("data-cid-1", "image-cid-1");
        assert!(spec.validate().is_ok());

        let bad_window = ElectionSpec::new("Bike lanes", "Center", 200, 200);
        assert_eq!(bad_window.validate(), Err(ElectionSpecError::InvalidWindow));

        let unnamed = ElectionSpec::new("  ", "Center", 100, 200);
        assert_eq!(unnamed.validate(), Err(ElectionSpecError::EmptyName));
    }
}
