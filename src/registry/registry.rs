// Identity registry
// Binds one hashed external identifier to exactly one membership
// commitment. The ledger is the durable source of truth; the mapping
// store is a read-optimized index, so the register flow is written to
// converge under idempotent retry after a partial failure.

use super::hash::hashed_key;
use super::store::{IdentityMapping, MappingStore, SetOutcome};
use crate::error::ProtocolError;
use crate::ledger::{classify, is_member_exists, LedgerClient, Uint256, WriteCall};
use crate::submitter::{SubmitError, TxSubmitter};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from registry configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// REGISTRY CONFIG
// ============================================================================

/// Configuration for the identity registry
#[derive(Clone, Debug, Default)]
pub struct RegistryConfig {
    /// Salt mixed into every hashed identifier key. Changing it orphans
    /// every existing mapping.
    pub salt: String,
}

impl RegistryConfig {
    /// Create a new config with builder pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hashing salt
    pub fn with_salt(mut self, salt: &str) -> Self {
        self.salt = salt.to_string();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RegistryConfigError> {
        if self.salt.is_empty() {
            return Err(RegistryConfigError::InvalidConfig(
                "salt cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// REGISTRATION RESULT
// ============================================================================

/// Result of a registration call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Registration {
    /// True if this call added the commitment; false if the identifier
    /// was already registered with the same commitment (idempotent no-op)
    pub registered: bool,
    /// The membership group the commitment belongs to
    pub group_id: u64,
}

// ============================================================================
// IDENTITY REGISTRY
// ============================================================================

/// Registry binding external identifiers to membership commitments
pub struct IdentityRegistry<C: LedgerClient, S: MappingStore> {
    client: Arc<C>,
    submitter: Arc<TxSubmitter<C>>,
    store: Arc<S>,
    config: RegistryConfig,
}

impl<C: LedgerClient, S: MappingStore> IdentityRegistry<C, S> {
    /// Create a new registry
    pub fn new(
        client: Arc<C>,
        submitter: Arc<TxSubmitter<C>>,
        store: Arc<S>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            client,
            submitter,
            store,
            config,
        }
    }

    /// Register an external identifier with a membership commitment
    ///
    /// - Same identifier, same commitment: idempotent no-op
    ///   (`registered: false`).
    /// - Same identifier, different commitment: permanent `Conflict`.
    /// - Unknown identifier: one `addMember` ledger write, then one
    ///   mapping-store write. If an earlier attempt got the member
    ///   on-ledger but crashed before the store write, the ledger's
    ///   "already a member" revert is treated as success so the retry
    ///   can still complete the mapping.
    pub async fn register(
        &self,
        external_id: &str,
        commitment: Uint256,
    ) -> Result<Registration, ProtocolError> {
        if external_id.is_empty() {
            return Err(ProtocolError::InvalidRequest(
                "external identifier cannot be empty".to_string(),
            ));
        }
        if commitment.is_zero() {
            return Err(ProtocolError::InvalidRequest(
                "commitment cannot be zero".to_string(),
            ));
        }

        let key = hashed_key(external_id, &self.config.salt);

        if let Some(existing) = self
            .store
            .get_if_exists(&key)
            .await
            .map_err(|e| ProtocolError::Store(e.to_string()))?
        {
            if existing.commitment() == commitment {
                info!(group_id = existing.group_id(), "identifier already registered");
                return Ok(Registration {
                    registered: false,
                    group_id: existing.group_id(),
                });
            }
            warn!("identifier already bound to a different commitment");
            return Err(ProtocolError::Conflict);
        }

        info!(commitment = %commitment, "adding member to membership group");
        match self.submitter.submit(&WriteCall::AddMember { commitment }).await {
            Ok(receipt) => {
                info!(tx_hash = %receipt.tx_hash(), "member added");
            }
            Err(SubmitError::Ledger(ref ledger_err)) if is_member_exists(ledger_err) => {
                // Partial-failure recovery: the member landed on-ledger in
                // an earlier attempt whose mapping write never happened.
                info!("commitment already on-ledger; completing mapping write");
            }
            Err(err) => return Err(err.into()),
        }

        // The group reported by the ledger after the write is mined
        let group_id = self
            .client
            .current_group_id()
            .await
            .map_err(classify)?;

        let mapping = IdentityMapping::new(commitment, group_id);
        match self
            .store
            .set_if_absent_or_matching(&key, &mapping)
            .await
            .map_err(|e| ProtocolError::Store(e.to_string()))?
        {
            SetOutcome::Inserted | SetOutcome::AlreadyPresent => {
                info!(group_id, "identity registered");
                Ok(Registration {
                    registered: true,
                    group_id,
                })
            }
            // Lost a race to a concurrent registration of the same
            // identifier with a different commitment
            SetOutcome::Conflict => {
                warn!("concurrent registration bound a different commitment");
                Err(ProtocolError::Conflict)
            }
        }
    }

    /// Look up the mapping for an external identifier. Pure read.
    pub async fn lookup(
        &self,
        external_id: &str,
    ) -> Result<Option<IdentityMapping>, ProtocolError> {
        let key = hashed_key(external_id, &self.config.salt);
        self.store
            .get_if_exists(&key)
            .await
            .map_err(|e| ProtocolError::Store(e.to_string()))
    }

    /// Look up just the commitment for an external identifier
    pub async fn lookup_commitment(
        &self,
        external_id: &str,
    ) -> Result<Option<Uint256>, ProtocolError> {
        Ok(self
            .lookup(external_id)
            .await?
            .map(|mapping| mapping.commitment()))
    }
}
