//! Error handling and edge case tests.

use fixture_store::{
    ChannelReportSink, FixtureError, FixtureRef, FixtureRegistry, FixtureSet, IdentityStrategy,
    MemoryCollection, MutationCounter,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const QUIET: Duration = Duration::from_millis(40);

fn counter() -> Arc<MutationCounter> {
    let (sink, _reports) = ChannelReportSink::new(8);
    Arc::new(MutationCounter::with_quiet_period(Arc::new(sink), QUIET))
}

// --- Registry Errors ---

#[test]
fn test_registry_second_open_locked() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixtures.reg");

    let _first = FixtureRegistry::open(&path).unwrap();
    assert!(matches!(
        FixtureRegistry::open(&path),
        Err(FixtureError::Locked)
    ));
}

#[test]
fn test_registry_reopens_after_drop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixtures.reg");

    {
        let _registry = FixtureRegistry::open(&path).unwrap();
    }
    assert!(FixtureRegistry::open(&path).is_ok());
}

#[test]
fn test_registry_rejects_foreign_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixtures.reg");
    std::fs::write(&path, b"not a registry file at all").unwrap();

    assert!(matches!(
        FixtureRegistry::open(&path),
        Err(FixtureError::InvalidFormat(_))
    ));
}

// --- Strategy Mismatches ---

#[test]
fn test_keyed_facade_rejects_payload_refs() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(FixtureRegistry::open(dir.path().join("fixtures.reg")).unwrap());
    let users = FixtureSet::builder(
        "users",
        Arc::new(MemoryCollection::new()),
        registry,
        counter(),
    )
    .build();

    let payload = json!({"n": 1});
    assert!(matches!(
        users.insert(&payload),
        Err(FixtureError::StrategyMismatch { .. })
    ));
    assert!(matches!(
        users.update(FixtureRef::Payload(&payload), &payload),
        Err(FixtureError::StrategyMismatch { .. })
    ));
}

#[test]
fn test_hashed_facade_rejects_keys() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(FixtureRegistry::open(dir.path().join("fixtures.reg")).unwrap());
    let users = FixtureSet::builder(
        "users",
        Arc::new(MemoryCollection::new()),
        registry,
        counter(),
    )
    .identity(IdentityStrategy::ContentHash)
    .build();

    assert!(matches!(
        users.insert_keyed("k", &json!({"n": 1})),
        Err(FixtureError::StrategyMismatch { .. })
    ));
    assert!(matches!(
        users.get(FixtureRef::Key("k")),
        Err(FixtureError::StrategyMismatch { .. })
    ));
}

// --- Collaborator Failures ---

#[test]
fn test_create_error_leaves_registry_unchanged() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(FixtureRegistry::open(dir.path().join("fixtures.reg")).unwrap());
    let users = FixtureSet::builder(
        "users",
        Arc::new(MemoryCollection::new()),
        registry,
        counter(),
    )
    .create_with(|_| Err(FixtureError::Collection("insert rejected".into())))
    .build();

    assert!(users.insert_keyed("admin", &json!({"n": 1})).is_err());
    assert_eq!(users.count(), 0);
    assert_eq!(users.flush().unwrap(), 0);
}

#[test]
fn test_remove_error_keeps_records_live() {
    let dir = TempDir::new().unwrap();
    let collection = Arc::new(MemoryCollection::new());
    let registry = Arc::new(FixtureRegistry::open(dir.path().join("fixtures.reg")).unwrap());

    let failing = FixtureSet::builder(
        "users",
        collection.clone(),
        registry.clone(),
        counter(),
    )
    .remove_with(|_| Err(FixtureError::Collection("remove rejected".into())))
    .build();

    failing.insert_keyed("admin", &json!({"n": 1})).unwrap();
    assert!(failing.remove(FixtureRef::Key("admin")).is_err());

    // registry entry survives, the document too
    assert_eq!(failing.count(), 1);
    assert_eq!(collection.len(), 1);
}

// --- Designed No-ops ---

#[test]
fn test_expected_outcomes_are_not_errors() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(FixtureRegistry::open(dir.path().join("fixtures.reg")).unwrap());
    let users = FixtureSet::builder(
        "users",
        Arc::new(MemoryCollection::new()),
        registry,
        counter(),
    )
    .build();

    users.insert_keyed("admin", &json!({"n": 1})).unwrap();

    // duplicate insert, missing-key update/remove, empty flush
    assert!(users.insert_keyed("admin", &json!({"n": 1})).unwrap().is_none());
    assert_eq!(users.update(FixtureRef::Key("ghost"), &json!({})).unwrap(), 0);
    assert_eq!(users.remove(FixtureRef::Key("ghost")).unwrap(), 0);

    users.remove(FixtureRef::Key("admin")).unwrap();
    assert_eq!(users.flush().unwrap(), 0);
}
