//! Debounced reporting tests, end to end through facades.

use fixture_store::{
    ChannelReportSink, FixtureRef, FixtureRegistry, FixtureSet, MemoryCollection, MutationCounter,
    MutationReport,
};
use crossbeam_channel::Receiver;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const QUIET: Duration = Duration::from_millis(250);
const WAIT: Duration = Duration::from_secs(2);

fn harness(
    dir: &TempDir,
) -> (
    Arc<MemoryCollection>,
    Arc<FixtureRegistry>,
    Arc<MutationCounter>,
    Receiver<MutationReport>,
) {
    let (sink, reports) = ChannelReportSink::new(64);
    (
        Arc::new(MemoryCollection::new()),
        Arc::new(FixtureRegistry::open(dir.path().join("fixtures.reg")).unwrap()),
        Arc::new(MutationCounter::with_quiet_period(Arc::new(sink), QUIET)),
        reports,
    )
}

#[test]
fn test_burst_produces_single_aggregated_report() {
    let dir = TempDir::new().unwrap();
    let (collection, registry, counter, reports) = harness(&dir);
    let users = FixtureSet::builder("users", collection, registry, counter).build();

    for i in 0..3 {
        users.insert_keyed(&format!("u{i}"), &json!({"n": i})).unwrap();
    }
    users
        .update(FixtureRef::Key("u0"), &json!({"n": 10}))
        .unwrap();
    users.remove(FixtureRef::Key("u2")).unwrap();

    let report = reports.recv_timeout(WAIT).unwrap();
    assert_eq!(report.collection, "users");
    assert_eq!(report.added, 3);
    assert_eq!(report.changed, 1);
    assert_eq!(report.removed, 1);

    // nothing else queued
    assert!(reports.recv_timeout(QUIET * 3).is_err());
}

#[test]
fn test_duplicate_insert_not_counted() {
    let dir = TempDir::new().unwrap();
    let (_collection, registry, counter, reports) = harness(&dir);
    let users = FixtureSet::builder(
        "users",
        Arc::new(MemoryCollection::new()),
        registry,
        counter,
    )
    .build();

    users.insert_keyed("admin", &json!({"n": 1})).unwrap();
    users.insert_keyed("admin", &json!({"n": 1})).unwrap();

    let report = reports.recv_timeout(WAIT).unwrap();
    assert_eq!(report.added, 1);
}

#[test]
fn test_two_names_report_independently() {
    let dir = TempDir::new().unwrap();
    let (collection, registry, counter, reports) = harness(&dir);
    let users = FixtureSet::builder(
        "users",
        collection.clone(),
        registry.clone(),
        counter.clone(),
    )
    .build();
    let posts = FixtureSet::builder("posts", collection, registry, counter).build();

    // interleaved mutations on two names
    users.insert_keyed("u0", &json!({"n": 0})).unwrap();
    posts.insert_keyed("p0", &json!({"t": "a"})).unwrap();
    users.insert_keyed("u1", &json!({"n": 1})).unwrap();
    posts.remove(FixtureRef::Key("p0")).unwrap();

    let mut by_name: HashMap<String, MutationReport> = HashMap::new();
    for _ in 0..2 {
        let report = reports.recv_timeout(WAIT).unwrap();
        by_name.insert(report.collection.clone(), report);
    }

    let users_report = &by_name["users"];
    assert_eq!(
        (users_report.added, users_report.changed, users_report.removed),
        (2, 0, 0)
    );

    let posts_report = &by_name["posts"];
    assert_eq!(
        (posts_report.added, posts_report.changed, posts_report.removed),
        (1, 0, 1)
    );
}

#[test]
fn test_cycle_resets_after_report() {
    let dir = TempDir::new().unwrap();
    let (collection, registry, counter, reports) = harness(&dir);
    let users = FixtureSet::builder("users", collection, registry, counter).build();

    users.insert_keyed("u0", &json!({"n": 0})).unwrap();
    let first = reports.recv_timeout(WAIT).unwrap();
    assert_eq!(first.added, 1);

    // a solitary later event starts a fresh cycle
    users.remove(FixtureRef::Key("u0")).unwrap();
    let second = reports.recv_timeout(WAIT).unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.removed, 1);
}

#[test]
fn test_update_counts_affected_documents() {
    let dir = TempDir::new().unwrap();
    let (collection, registry, counter, reports) = harness(&dir);
    let users = FixtureSet::builder("users", collection, registry, counter).build();

    users.insert_keyed("u0", &json!({"active": false})).unwrap();

    // missing key: no event at all
    users.update(FixtureRef::Key("ghost"), &json!({"x": 1})).unwrap();
    users
        .update(FixtureRef::Key("u0"), &json!({"active": true}))
        .unwrap();

    let report = reports.recv_timeout(WAIT).unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.changed, 1);
}
