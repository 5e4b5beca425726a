// Registry Tests
// One identifier, one commitment: idempotence, conflicts, and
// convergence after a partial failure between ledger and store.

use civicpoll::error::ProtocolError;
use civicpoll::ledger::{InMemoryLedger, LedgerClient, Uint256};
use civicpoll::registry::{
    IdentityRegistry, MemoryMappingStore, RegistryConfig, SledMappingStore,
};
use civicpoll::submitter::{SubmitterConfig, TxSubmitter};
use std::sync::Arc;
use tempfile::TempDir;

type MemoryRegistry = IdentityRegistry<InMemoryLedger, MemoryMappingStore>;

fn new_registry() -> (Arc<InMemoryLedger>, Arc<MemoryMappingStore>, MemoryRegistry) {
    let ledger = Arc::new(InMemoryLedger::new());
    let submitter = Arc::new(TxSubmitter::new(ledger.clone(), SubmitterConfig::default()));
    let store = Arc::new(MemoryMappingStore::new());
    let registry = IdentityRegistry::new(
        ledger.clone(),
        submitter,
        store.clone(),
        RegistryConfig::new().with_salt("test-salt"),
    );
    (ledger, store, registry)
}

// ============================================================================
// CONFIG
// ============================================================================

#[test]
fn test_config_requires_salt() {
    assert!(RegistryConfig::new().validate().is_err());
    assert!(RegistryConfig::new().with_salt("s").validate().is_ok());
}

// ============================================================================
// REGISTRATION
// ============================================================================

#[tokio::test]
async fn test_register_idempotent_and_conflicting() {
    let (ledger, _store, registry) = new_registry();
    let commitment = Uint256::from_u64(42);

    // First registration adds the member
    let first = registry.register("1234567890123", commitment).await.unwrap();
    assert!(first.registered);
    assert_eq!(first.group_id, 0);

    // Same pair again: no-op, no second ledger write
    let second = registry.register("1234567890123", commitment).await.unwrap();
    assert!(!second.registered);
    assert_eq!(second.group_id, 0);
    assert_eq!(ledger.write_log(), vec!["addMember"]);

    // Different commitment: permanent conflict, mapping unchanged
    let conflict = registry
        .register("1234567890123", Uint256::from_u64(99))
        .await;
    assert_eq!(conflict, Err(ProtocolError::Conflict));

    let mapping = registry.lookup("1234567890123").await.unwrap().unwrap();
    assert_eq!(mapping.commitment(), commitment);
    assert_eq!(ledger.write_log(), vec!["addMember"]);
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let (_ledger, _store, registry) = new_registry();

    assert!(matches!(
        registry.register("", Uint256::from_u64(42)).await,
        Err(ProtocolError::InvalidRequest(_))
    ));
    assert!(matches!(
        registry.register("1234567890123", Uint256::ZERO).await,
        Err(ProtocolError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn test_register_distinct_identifiers() {
    let (ledger, _store, registry) = new_registry();

    let alice = registry
        .register("1111111111111", Uint256::from_u64(10))
        .await
        .unwrap();
    let bob = registry
        .register("2222222222222", Uint256::from_u64(20))
        .await
        .unwrap();

    assert!(alice.registered);
    assert!(bob.registered);
    assert_eq!(ledger.write_log(), vec!["addMember", "addMember"]);

    let members = ledger.group_members(0).await.unwrap();
    assert_eq!(members, vec![Uint256::from_u64(10), Uint256::from_u64(20)]);
}

#[tokio::test]
async fn test_partial_failure_recovery() {
    let (ledger, store, registry) = new_registry();
    let commitment = Uint256::from_u64(42);

    // The ledger write lands but the mapping write fails
    store.fail_next_set();
    let first = registry.register("1234567890123", commitment).await;
    assert!(matches!(first, Err(ProtocolError::Store(_))));
    assert_eq!(ledger.write_log(), vec!["addMember"]);
    assert!(store.is_empty());

    // The retry sees the member-exists revert, treats it as success, and
    // completes the mapping write
    let retried = registry.register("1234567890123", commitment).await.unwrap();
    assert!(retried.registered);
    assert_eq!(retried.group_id, 0);
    assert_eq!(store.len(), 1);

    // Still exactly one executed ledger write for this identifier
    assert_eq!(ledger.write_log(), vec!["addMember"]);
}

// ============================================================================
// LOOKUP
// ============================================================================

#[tokio::test]
async fn test_lookup() {
    let (_ledger, _store, registry) = new_registry();

    assert!(registry.lookup("1234567890123").await.unwrap().is_none());
    assert!(registry
        .lookup_commitment("1234567890123")
        .await
        .unwrap()
        .is_none());

    registry
        .register("1234567890123", Uint256::from_u64(42))
        .await
        .unwrap();

    let mapping = registry.lookup("1234567890123").await.unwrap().unwrap();
    assert_eq!(mapping.commitment(), Uint256::from_u64(42));
    assert_eq!(mapping.group_id(), 0);
    assert_eq!(
        registry.lookup_commitment("1234567890123").await.unwrap(),
        Some(Uint256::from_u64(42))
    );
}

// ============================================================================
// SLED-BACKED REGISTRY
// ============================================================================

#[tokio::test]
async fn test_register_survives_store_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let ledger = Arc::new(InMemoryLedger::new());
    let submitter = Arc::new(TxSubmitter::new(ledger.clone(), SubmitterConfig::default()));
    let config = RegistryConfig::new().with_salt("test-salt");

    {
        let store = Arc::new(SledMappingStore::open(temp_dir.path()).unwrap());
        let registry =
            IdentityRegistry::new(ledger.clone(), submitter.clone(), store, config.clone());
        let result = registry
            .register("1234567890123", Uint256::from_u64(42))
            .await
            .unwrap();
        assert!(result.registered);
    }

    // Reopen the store: the binding is durable and still conflicts
    let store = Arc::new(SledMappingStore::open(temp_dir.path()).unwrap());
    let registry = IdentityRegistry::new(ledger.clone(), submitter, store, config);

    let repeat = registry
        .register("1234567890123", Uint256::from_u64(42))
        .await
        .unwrap();
    assert!(!repeat.registered);
    assert_eq!(
        registry.register("1234567890123", Uint256::from_u64(99)).await,
        Err(ProtocolError::Conflict)
    );
    assert_eq!(ledger.write_log(), vec!["addMember"]);
}
