// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enrollment specs
//!
//! An agent presenting an active enrollment key gets a fresh identity, an
//! access key scoped to it, and a persisted agent record. Invalid requests
//! fail before anything is minted or written.

use crate::prelude::*;

#[tokio::test]
async fn valid_enrollment_creates_online_agent_with_fresh_id() {
    for enroll_type in ["EPHEMERAL", "PERMANENT", "TEMPORARY"] {
        let fleet = Fleet::new();

        let resp = fleet.enroll(json!({"type": enroll_type})).await.unwrap();

        assert_eq!(resp.action, "created");
        assert_eq!(resp.item.status, "online");
        assert_eq!(resp.item.enroll_type.to_string(), enroll_type);
        assert_ne!(resp.item.id, enrollment_key().id);
        assert_ne!(resp.item.id, enrollment_key().api_key_id);
        assert!(fleet.store.get(FLEET_AGENTS, &resp.item.id).is_some());
    }
}

#[tokio::test]
async fn every_enrollment_gets_its_own_identity() {
    let fleet = Fleet::new();

    let a = fleet.enroll(json!({"type": "PERMANENT"})).await.unwrap();
    let b = fleet.enroll(json!({"type": "PERMANENT"})).await.unwrap();

    assert_ne!(a.item.id, b.item.id);
    assert_ne!(a.item.access_api_key_id, b.item.access_api_key_id);
    assert_eq!(fleet.store.len(FLEET_AGENTS), 2);
}

#[tokio::test]
async fn unknown_enroll_type_fails_without_writes() {
    let fleet = Fleet::new();

    let err = fleet.enroll(json!({"type": "BOGUS"})).await.unwrap_err();

    assert!(matches!(err, EnrollError::UnknownEnrollType(ref t) if t == "BOGUS"));
    assert_eq!(fleet.store.calls().writes(), 0);
    assert!(fleet.issuer.calls().is_empty());
    assert_eq!(ApiError::from(&err).category, ErrorCategory::BadRequest);
}

#[tokio::test]
async fn shared_id_fails_without_writes_or_mint() {
    let fleet = Fleet::new();

    let err = fleet.enroll(json!({"type": "PERMANENT", "shared_id": "abc"})).await.unwrap_err();

    assert!(matches!(err, EnrollError::SharedIdUnsupported));
    assert_eq!(fleet.store.calls().writes(), 0);
    assert!(fleet.issuer.calls().is_empty());
}

#[tokio::test]
async fn enrollment_key_lookups_are_cached_for_their_ttl() {
    let fleet = Fleet::new();

    fleet.enroll(json!({"type": "PERMANENT"})).await.unwrap();
    fleet.enroll(json!({"type": "PERMANENT"})).await.unwrap();
    assert_eq!(fleet.store.calls().search, 1);

    fleet.clock.advance(Duration::from_secs(31));
    fleet.enroll(json!({"type": "PERMANENT"})).await.unwrap();
    assert_eq!(fleet.store.calls().search, 2);
}

#[tokio::test]
async fn inactive_enrollment_key_is_unauthorized() {
    let fleet = Fleet::new();
    let dead = EnrollmentApiKey::builder()
        .id("doc-dead")
        .api_key_id("dead")
        .api_key(ApiKey::new("dead", "secret").token())
        .active(false)
        .build();
    seed_enrollment_key(&fleet.store, &dead);

    let err = fleet
        .enroller
        .handle_enroll(
            Some(&format!("ApiKey {}", dead.api_key)),
            Some(AGENT_USER_AGENT),
            br#"{"type":"PERMANENT"}"#,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EnrollError::InactiveKey));
    let api = ApiError::from(&err);
    assert_eq!((api.status, api.category), (401, ErrorCategory::Unauthorized));
    assert!(fleet.issuer.calls().is_empty());
}

#[tokio::test]
async fn saturated_server_sheds_load_with_429() {
    let mut config = Config::default();
    config.limits.enroll.interval_ms = Duration::from_secs(3600);
    config.limits.enroll.burst = 1;
    let fleet = Fleet::with_config(config);

    fleet.enroll(json!({"type": "PERMANENT"})).await.unwrap();
    let err = fleet.enroll(json!({"type": "PERMANENT"})).await.unwrap_err();

    assert_eq!(ApiError::from(&err).status, 429);
    assert_eq!(fleet.store.len(FLEET_AGENTS), 1);
}

#[tokio::test]
async fn failed_persistence_leaves_minted_key_behind() {
    let fleet = Fleet::new();
    fleet.store.fail_next(StoreOp::Create, Fault::Unavailable);

    let err = fleet.enroll(json!({"type": "PERMANENT"})).await.unwrap_err();

    let api = ApiError::from(&err);
    assert_eq!(api.status, 500);
    assert_eq!(api.message, "failed to create agent");
    assert_eq!(fleet.issuer.calls().len(), 1);
    assert!(fleet.store.is_empty(FLEET_AGENTS));
}

#[tokio::test]
async fn access_key_is_recorded_for_the_new_agent() {
    let fleet = Fleet::with_store_issuer();

    let resp = fleet.enroll(json!({"type": "PERMANENT"})).await.unwrap();

    let header = format!("ApiKey {}", resp.item.access_api_key);
    let token = fleet_adapters::parse_authorization(Some(&header)).unwrap();
    assert_eq!(token.id, resp.item.access_api_key_id);

    let key_doc = fleet.store.get(FLEET_API_KEYS, &token.id).unwrap();
    assert_eq!(key_doc.source["name"], json!(resp.item.id));
    assert_eq!(key_doc.source["metadata"]["agent_id"], json!(resp.item.id));
    assert_eq!(key_doc.source["metadata"]["type"], "access");
    assert_eq!(fleet.enroller.cache().get_api_key(&token.id), Some(token));
}

#[tokio::test]
async fn outdated_agent_is_turned_away_before_minting() {
    let fleet = Fleet::new();

    let err = fleet
        .enroller
        .handle_enroll(
            Some(&enroll_auth()),
            Some("Elastic Agent v7.9.3"),
            br#"{"type":"PERMANENT"}"#,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    let api = ApiError::from(&err);
    assert_eq!(api.status, 400);
    assert_eq!(api.category, ErrorCategory::UnsupportedVersion);
    assert!(fleet.issuer.calls().is_empty());
    assert_eq!(fleet.store.calls().writes(), 0);
}
