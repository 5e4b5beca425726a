// Administrative operations
// Create/update/delete elections and process proposer submissions, all
// relayed through the submitter from the operator identity. Lifecycle
// fields stay read-only here; only the monitor writes them.

use super::model::{ElectionSpec, PendingProposal, Proposal};
use crate::error::ProtocolError;
use crate::ledger::{classify, LedgerClient, TxReceipt, WriteCall};
use crate::submitter::TxSubmitter;
use std::sync::Arc;
use tracing::info;

/// Administrator surface over the election ledger
pub struct ElectionAdmin<C: LedgerClient> {
    client: Arc<C>,
    submitter: Arc<TxSubmitter<C>>,
}

impl<C: LedgerClient> ElectionAdmin<C> {
    /// Create a new admin surface
    pub fn new(client: Arc<C>, submitter: Arc<TxSubmitter<C>>) -> Self {
        Self { client, submitter }
    }

    /// Create a new election
    pub async fn create_election(&self, spec: ElectionSpec) -> Result<TxReceipt, ProtocolError> {
        spec.validate()
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string()))?;
        info!(name = spec.name(), "creating election");
        self.submit(WriteCall::CreateElection { spec }).await
    }

    /// Update an election that is neither active nor finalized
    pub async fn update_election(
        &self,
        election_id: u64,
        spec: ElectionSpec,
    ) -> Result<TxReceipt, ProtocolError> {
        spec.validate()
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string()))?;
        info!(election_id, "updating election");
        self.submit(WriteCall::UpdateElection { election_id, spec })
            .await
    }

    /// Delete an election that is neither active nor finalized
    pub async fn delete_election(&self, election_id: u64) -> Result<TxReceipt, ProtocolError> {
        info!(election_id, "deleting election");
        self.submit(WriteCall::DeleteElection { election_id }).await
    }

    /// Submit a proposal for review, before the election starts
    pub async fn submit_proposal(
        &self,
        election_id: u64,
        data_cid: &str,
        image_cid: &str,
    ) -> Result<TxReceipt, ProtocolError> {
        self.submit(WriteCall::SubmitProposal {
            election_id,
            data_cid: data_cid.to_string(),
            image_cid: image_cid.to_string(),
        })
        .await
    }

    /// Accept a pending proposal into the election
    pub async fn accept_proposal(
        &self,
        election_id: u64,
        proposal_id: u64,
    ) -> Result<TxReceipt, ProtocolError> {
        info!(election_id, proposal_id, "accepting proposal");
        self.submit(WriteCall::AcceptProposal {
            election_id,
            proposal_id,
        })
        .await
    }

    /// Decline a pending proposal
    pub async fn decline_proposal(
        &self,
        election_id: u64,
        proposal_id: u64,
    ) -> Result<TxReceipt, ProtocolError> {
        info!(election_id, proposal_id, "declining proposal");
        self.submit(WriteCall::DeclineProposal {
            election_id,
            proposal_id,
        })
        .await
    }

    /// Fetch the unprocessed pending proposals for an election
    pub async fn pending_proposals(
        &self,
        election_id: u64,
    ) -> Result<Vec<PendingProposal>, ProtocolError> {
        self.client
            .get_pending_proposals(election_id)
            .await
            .map_err(classify)
    }

    /// Fetch an election's proposals with counts and winning flags
    pub async fn results(&self, election_id: u64) -> Result<Vec<Proposal>, ProtocolError> {
        self.client.get_proposals(election_id).await.map_err(classify)
    }

    async fn submit(&self, call: WriteCall) -> Result<TxReceipt, ProtocolError> {
        self.submitter.submit(&call).await.map_err(Into::into)
    }
}
