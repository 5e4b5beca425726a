// Mapping store
// Persistent index from hashed external identifier to identity mapping.
// Append-only per key: the atomic set-if-absent-or-matching is what
// keeps two concurrent registrations of the same identifier from
// binding two different commitments.

use crate::ledger::Uint256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Errors from mapping-store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    OpenFailed(String),

    #[error("Store operation failed: {0}")]
    Backend(String),

    #[error("Value encoding failed: {0}")]
    Codec(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

// ============================================================================
// IDENTITY MAPPING
// ============================================================================

/// The value bound to one hashed external identifier
///
/// Created once at registration and never destroyed. A given key maps to
/// at most one commitment for all time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMapping {
    commitment: Uint256,
    group_id: u64,
}

impl IdentityMapping {
    /// Create a new mapping
    pub fn new(commitment: Uint256, group_id: u64) -> Self {
        Self {
            commitment,
            group_id,
        }
    }

    /// Get the identity commitment
    pub fn commitment(&self) -> Uint256 {
        self.commitment
    }

    /// Get the membership group the commitment was added to
    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        postcard::to_allocvec(self).map_err(|e| StoreError::Codec(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        postcard::from_bytes(bytes).map_err(|e| StoreError::Codec(e.to_string()))
    }
}

/// Outcome of an atomic conditional write
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOutcome {
    /// No value existed; the new one was written
    Inserted,
    /// An identical value already existed; nothing was written
    AlreadyPresent,
    /// A different value already exists; nothing was written
    Conflict,
}

/// Index from hashed external identifier to identity mapping
///
/// `set_if_absent_or_matching` must be atomic at the granularity of one
/// key: a plain check-then-set would let two concurrent registrations of
/// the same identifier race.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Fetch the mapping for a hashed key, if one exists
    async fn get_if_exists(&self, hashed_key: &str) -> Result<Option<IdentityMapping>, StoreError>;

    /// Atomically write the mapping unless a different one already exists
    async fn set_if_absent_or_matching(
        &self,
        hashed_key: &str,
        mapping: &IdentityMapping,
    ) -> Result<SetOutcome, StoreError>;
}

// ============================================================================
// SLED STORE
// ============================================================================

/// Sled-backed persistent mapping store
///
/// Atomicity comes from sled's compare-and-swap; writes are flushed so a
/// crash cannot lose a mapping the caller was told about.
pub struct SledMappingStore {
    db: sled::Db,
}

impl SledMappingStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }
}

#[async_trait]
impl MappingStore for SledMappingStore {
    async fn get_if_exists(&self, hashed_key: &str) -> Result<Option<IdentityMapping>, StoreError> {
        match self.db.get(hashed_key.as_bytes())? {
            Some(bytes) => Ok(Some(IdentityMapping::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set_if_absent_or_matching(
        &self,
        hashed_key: &str,
        mapping: &IdentityMapping,
    ) -> Result<SetOutcome, StoreError> {
        let bytes = mapping.to_bytes()?;
        let result = self
            .db
            .compare_and_swap(hashed_key.as_bytes(), None as Option<&[u8]>, Some(bytes))
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match result {
            Ok(()) => {
                self.db
                    .flush_async()
                    .await
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                Ok(SetOutcome::Inserted)
            }
            Err(cas_error) => {
                let current = cas_error
                    .current
                    .as_ref()
                    .map(|bytes| IdentityMapping::from_bytes(bytes))
                    .transpose()?;
                match current {
                    Some(existing) if existing == *mapping => Ok(SetOutcome::AlreadyPresent),
                    _ => Ok(SetOutcome::Conflict),
                }
            }
        }
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-memory mapping store for tests
///
/// Can be scripted to fail the next write, to exercise the
/// partial-failure recovery path in the registry.
#[derive(Default)]
pub struct MemoryMappingStore {
    entries: Mutex<HashMap<String, IdentityMapping>>,
    fail_next_set: AtomicBool,
}

impl MemoryMappingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next conditional write fail with a backend error
    pub fn fail_next_set(&self) {
        self.fail_next_set.store(true, Ordering::SeqCst);
    }

    /// Number of stored mappings
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn get_if_exists(&self, hashed_key: &str) -> Result<Option<IdentityMapping>, StoreError> {
        Ok(self.entries.lock().unwrap().get(hashed_key).cloned())
    }

    async fn set_if_absent_or_matching(
        &self,
        hashed_key: &str,
        mapping: &IdentityMapping,
    ) -> Result<SetOutcome, StoreError> {
        if self.fail_next_set.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("scripted write failure".to_string()));
        }

        let mut entries = self.entries.lock().unwrap();
        match entries.get(hashed_key) {
            Some(existing) if existing == mapping => Ok(SetOutcome::AlreadyPresent),
            Some(_) => Ok(SetOutcome::Conflict),
            None => {
                entries.insert(hashed_key.to_string(), mapping.clone());
                Ok(SetOutcome::Inserted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mapping(commitment: u64, group_id: u64) -> IdentityMapping {
        IdentityMapping::new(Uint256::from_u64(commitment), group_id)
    }

    #[tokio::test]
    async fn test_sled_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = SledMappingStore::open(temp_dir.path()).unwrap();

        assert!(store.get_if_exists("key").await.unwrap().is_none());

        let value = mapping(42, 0);
        assert_eq!(
            store.set_if_absent_or_matching("key", &value).await.unwrap(),
            SetOutcome::Inserted
        );
        assert_eq!(store.get_if_exists("key").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_sled_store_conflict_keeps_original() {
        let temp_dir = TempDir::new().unwrap();
        let store = SledMappingStore::open(temp_dir.path()).unwrap();

        let original = mapping(42, 0);
        store
            .set_if_absent_or_matching("key", &original)
            .await
            .unwrap();

        assert_eq!(
            store
                .set_if_absent_or_matching("key", &original)
                .await
                .unwrap(),
            SetOutcome::AlreadyPresent
        );
        assert_eq!(
            store
                .set_if_absent_or_matching("key", &mapping(99, 0))
                .await
                .unwrap(),
            SetOutcome::Conflict
        );
        assert_eq!(store.get_if_exists("key").await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_memory_store_scripted_failure() {
        let store = MemoryMappingStore::new();
        store.fail_next_set();

        let value = mapping(42, 0);
        assert!(store
            .set_if_absent_or_matching("key", &value)
            .await
            .is_err());

        // Next write goes through
        assert_eq!(
            store.set_if_absent_or_matching("key", &value).await.unwrap(),
            SetOutcome::Inserted
        );
    }
}
