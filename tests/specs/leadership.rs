// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy leadership specs
//!
//! Claims overwrite, releases only touch a lease the caller holds, and a
//! release that loses a race to a new claim still succeeds.

use crate::prelude::*;

fn lease(store: &MemoryStore, policy_id: &str) -> Value {
    store.get(FLEET_POLICIES_LEADER, policy_id).unwrap().source
}

fn replica(
    store: &MemoryStore,
    clock: &FakeClock,
    server_id: &str,
) -> LeadershipMonitor<MemoryStore, FakeClock> {
    LeadershipMonitor::new(
        store.clone(),
        clock.clone(),
        MonitorSettings {
            server_id: server_id.to_string(),
            version: "v1".to_string(),
            policy_ids: vec![PolicyId::new("P")],
            renew_interval: Duration::from_secs(30),
            lease_ttl: Duration::from_secs(60),
            release_interval: Duration::from_secs(120),
        },
    )
}

#[tokio::test]
async fn first_claim_creates_lease_and_later_claim_overwrites() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let manager = PolicyLeaderManager::new(store.clone(), clock.clone());
    let cancel = CancellationToken::new();
    let p = PolicyId::new("P");

    manager.take_leadership(&p, "srvA", "v1", &cancel).await.unwrap();
    similar_asserts::assert_eq!(
        lease(&store, "P"),
        json!({
            "server": {"id": "srvA", "version": "v1"},
            "@timestamp": "2024-01-01T00:00:00.000000000Z",
        })
    );

    manager.take_leadership(&p, "srvB", "v1", &cancel).await.unwrap();
    assert_eq!(lease(&store, "P")["server"]["id"], "srvB");
}

#[tokio::test]
async fn release_by_non_holder_changes_nothing() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let manager = PolicyLeaderManager::new(store.clone(), clock.clone());
    let cancel = CancellationToken::new();
    let p = PolicyId::new("P");
    manager.take_leadership(&p, "srvB", "v1", &cancel).await.unwrap();
    let before = store.get(FLEET_POLICIES_LEADER, "P").unwrap();

    manager.release_leadership(&p, "srvA", Duration::from_secs(60), &cancel).await.unwrap();

    let after = store.get(FLEET_POLICIES_LEADER, "P").unwrap();
    similar_asserts::assert_eq!(after.source, before.source);
    assert_eq!(after.seq_no, before.seq_no);
}

#[tokio::test]
async fn release_by_holder_backdates_lease() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let manager = PolicyLeaderManager::new(store.clone(), clock.clone());
    let cancel = CancellationToken::new();
    let p = PolicyId::new("P");
    manager.take_leadership(&p, "srvA", "v1", &cancel).await.unwrap();

    manager.release_leadership(&p, "srvA", Duration::from_secs(60), &cancel).await.unwrap();

    assert_eq!(lease(&store, "P")["@timestamp"], "2023-12-31T23:59:00.000000000Z");
}

#[tokio::test]
async fn release_that_loses_a_race_still_succeeds() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let manager = PolicyLeaderManager::new(store.clone(), clock.clone());
    let cancel = CancellationToken::new();
    let p = PolicyId::new("P");
    manager.take_leadership(&p, "srvA", "v1", &cancel).await.unwrap();
    store.fail_next(StoreOp::Update, Fault::Conflict);

    manager.release_leadership(&p, "srvA", Duration::from_secs(60), &cancel).await.unwrap();
}

#[tokio::test]
async fn replicas_hand_over_a_policy_on_shutdown() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let a = replica(&store, &clock, "srvA");
    let b = replica(&store, &clock, "srvB");
    let cancel = CancellationToken::new();

    a.check(&cancel).await.unwrap();
    b.check(&cancel).await.unwrap();
    assert_eq!(a.held(), vec![PolicyId::new("P")]);
    assert!(b.held().is_empty());

    a.release_all().await;
    b.check(&cancel).await.unwrap();

    assert!(a.held().is_empty());
    assert_eq!(b.held(), vec![PolicyId::new("P")]);
    let leader: PolicyLeader = serde_json::from_value(lease(&store, "P")).unwrap();
    assert!(leader.is_held_by("srvB"));
}

#[tokio::test]
async fn abandoned_lease_is_taken_after_it_goes_stale() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let a = replica(&store, &clock, "srvA");
    let b = replica(&store, &clock, "srvB");
    let cancel = CancellationToken::new();
    a.check(&cancel).await.unwrap();

    clock.advance(Duration::from_secs(59));
    b.check(&cancel).await.unwrap();
    assert!(b.held().is_empty());

    clock.advance(Duration::from_secs(2));
    b.check(&cancel).await.unwrap();
    assert_eq!(b.held(), vec![PolicyId::new("P")]);
}
