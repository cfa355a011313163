// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_adapters::{FakeCredentialIssuer, LimitError};
use fleet_core::test_support::local_metadata;
use fleet_core::{ApiKey, FakeClock, SequentialIdGen};
use fleet_storage::index::{FLEET_AGENTS, FLEET_ENROLLMENT_API_KEYS};
use fleet_storage::records::get_agent;
use fleet_storage::{Fault, MemoryStore, StoreOp};

use crate::error::ErrorCategory;

type TestEnroller = Enroller<MemoryStore, FakeCredentialIssuer, FakeClock>;

struct Harness {
    store: MemoryStore,
    issuer: FakeCredentialIssuer,
    clock: FakeClock,
    enroller: TestEnroller,
}

fn seed_key(store: &MemoryStore, record: &EnrollmentApiKey) {
    store.insert(FLEET_ENROLLMENT_API_KEYS, &record.id, serde_json::to_value(record).unwrap());
}

fn harness_with(config: Config) -> Harness {
    let store = MemoryStore::new();
    seed_key(&store, &EnrollmentApiKey::builder().build());
    let issuer = FakeCredentialIssuer::new();
    let clock = FakeClock::new();
    let enroller = Enroller::new(store.clone(), issuer.clone(), clock.clone(), &config)
        .with_id_gen(SequentialIdGen::new("agent"));
    Harness { store, issuer, clock, enroller }
}

fn harness() -> Harness {
    harness_with(Config::default())
}

fn auth() -> String {
    format!("ApiKey {}", ApiKey::new("enroll-key-1", "secret").token())
}

const AGENT: &str = "Elastic Agent v8.1.0";

fn body(value: Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

async fn post(
    enroller: &TestEnroller,
    header: Option<&str>,
    value: Value,
) -> Result<Vec<u8>, EnrollError> {
    enroller.handle_enroll(header, Some(AGENT), &body(value), &CancellationToken::new()).await
}

impl Harness {
    async fn send(&self, body: &[u8]) -> Result<EnrollResponse, EnrollError> {
        let data = self
            .enroller
            .handle_enroll(Some(&auth()), Some(AGENT), body, &CancellationToken::new())
            .await?;
        Ok(serde_json::from_slice(&data).unwrap())
    }
}

#[tokio::test]
async fn enrolls_with_each_valid_type() {
    for (name, expected) in [
        ("EPHEMERAL", EnrollType::Ephemeral),
        ("PERMANENT", EnrollType::Permanent),
        ("TEMPORARY", EnrollType::Temporary),
    ] {
        let h = harness();

        let resp = h.send(&body(json!({"type": name}))).await.unwrap();

        assert_eq!(resp.action, "created");
        assert_eq!(resp.item.id, "agent-1");
        assert_ne!(resp.item.id, "enroll-key-1");
        assert_eq!(resp.item.status, "online");
        assert_eq!(resp.item.enroll_type, expected);
        assert_eq!(resp.item.policy_id, "policy-1");
        assert_eq!(resp.item.access_api_key_id, "key-1");
        assert_eq!(resp.item.access_api_key, ApiKey::new("key-1", "secret-1").token());
        assert!(resp.item.active);
    }
}

#[tokio::test]
async fn persists_agent_with_fresh_identity() {
    let h = harness();

    h.send(&body(json!({"type": "PERMANENT"}))).await.unwrap();

    let agent = get_agent(&h.store, &AgentId::new("agent-1")).await.unwrap().unwrap();
    assert_eq!(agent.policy_id, "policy-1");
    assert_eq!(agent.access_api_key_id, "key-1");
    assert_eq!(agent.action_seq_no, vec![fleet_core::UNDEFINED_SEQ_NO]);
    assert_eq!(agent.enrolled_at, "2024-01-01T00:00:00Z");
}

#[tokio::test]
async fn mints_access_key_scoped_to_agent() {
    let h = harness();

    h.send(&body(json!({"type": "PERMANENT"}))).await.unwrap();

    let calls = h.issuer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "agent-1");
    assert_eq!(calls[0].metadata, ApiKeyMetadata::new("agent-1", ApiKeyType::Access));
    assert_eq!(calls[0].role_descriptors, access_role_descriptors());
}

#[tokio::test]
async fn warms_cache_with_access_key() {
    let h = harness();

    h.send(&body(json!({"type": "PERMANENT"}))).await.unwrap();

    assert_eq!(h.enroller.cache().get_api_key("key-1"), Some(ApiKey::new("key-1", "secret-1")));
    h.clock.advance(Duration::from_secs(31));
    assert_eq!(h.enroller.cache().get_api_key("key-1"), None);
}

#[tokio::test]
async fn patches_local_metadata_agent_id() {
    let h = harness();
    let local = local_metadata("OLD");

    let resp = h
        .send(&body(json!({"type": "PERMANENT", "metadata": {"local": local.clone()}})))
        .await
        .unwrap();

    let patched = resp.item.local_metadata.unwrap();
    assert_eq!(patched["elastic"]["agent"]["id"], "agent-1");
    assert_eq!(patched["elastic"]["agent"]["version"], local["elastic"]["agent"]["version"]);
    assert_eq!(patched["host"], local["host"]);
    assert_eq!(patched["os"], local["os"]);

    let stored = h.store.get(FLEET_AGENTS, "agent-1").unwrap();
    assert_eq!(stored.source["local_metadata"], patched);
}

#[tokio::test]
async fn keeps_user_provided_metadata() {
    let h = harness();

    let resp = h
        .send(&body(json!({"type": "PERMANENT", "metadata": {"user_provided": {"team": "ops"}}})))
        .await
        .unwrap();

    assert_eq!(resp.item.user_provided_metadata, Some(json!({"team": "ops"})));
    assert_eq!(resp.item.local_metadata, None);
}

#[tokio::test]
async fn unknown_enroll_type_has_no_side_effects() {
    for request in [json!({"type": "BOGUS"}), json!({"type": "permanent"}), json!({})] {
        let h = harness();

        let err = h.send(&body(request)).await.unwrap_err();

        assert!(matches!(err, EnrollError::UnknownEnrollType(_)), "got {err:?}");
        assert_eq!(h.store.calls().writes(), 0);
        assert!(h.issuer.calls().is_empty());
    }
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let h = harness();

    let err = h.send(b"{not json").await.unwrap_err();

    assert!(matches!(err, EnrollError::Malformed(_)));
    assert_eq!(h.store.calls().writes(), 0);
}

#[tokio::test]
async fn shared_id_is_unsupported() {
    let h = harness();

    let err =
        h.send(&body(json!({"type": "PERMANENT", "shared_id": "existing"}))).await.unwrap_err();

    assert!(matches!(err, EnrollError::SharedIdUnsupported));
    assert_eq!(h.store.calls().writes(), 0);
    assert!(h.issuer.calls().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut config = Config::default();
    config.limits.enroll.max_body_bytes = 8;
    let h = harness_with(config);

    let err = h.send(&body(json!({"type": "PERMANENT"}))).await.unwrap_err();

    assert!(matches!(err, EnrollError::BodyTooLarge { limit: 8 }));
    assert!(h.issuer.calls().is_empty());
}

#[tokio::test]
async fn enrollment_key_is_cached_until_ttl() {
    let h = harness();
    let cancel = CancellationToken::new();

    h.enroller.fetch_enrollment_key_record("enroll-key-1", &cancel).await.unwrap();
    h.enroller.fetch_enrollment_key_record("enroll-key-1", &cancel).await.unwrap();
    assert_eq!(h.store.calls().search, 1);

    h.clock.advance(Duration::from_secs(31));
    let record = h.enroller.fetch_enrollment_key_record("enroll-key-1", &cancel).await.unwrap();
    assert_eq!(h.store.calls().search, 2);
    assert_eq!(record.id, "enroll-doc-1");
    assert_eq!(record.policy_id, "policy-1");
}

#[tokio::test]
async fn inactive_key_is_rejected_and_not_cached() {
    let h = harness();
    seed_key(
        &h.store,
        &EnrollmentApiKey::builder().id("doc-2").api_key_id("dead-key").active(false).build(),
    );
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        let err = h.enroller.fetch_enrollment_key_record("dead-key", &cancel).await.unwrap_err();
        assert!(matches!(err, EnrollError::InactiveKey));
    }
    assert_eq!(h.store.calls().search, 2);
    assert!(h.enroller.cache().get_enrollment_api_key("dead-key").is_none());
}

#[tokio::test]
async fn unknown_key_is_unauthorized() {
    let h = harness();
    let header = format!("ApiKey {}", ApiKey::new("nobody", "secret").token());

    let err = post(&h.enroller, Some(&header), json!({"type": "PERMANENT"})).await.unwrap_err();

    assert!(matches!(err, EnrollError::KeyNotFound));
}

#[tokio::test]
async fn wrong_secret_is_unauthorized() {
    let h = harness();
    let header = format!("ApiKey {}", ApiKey::new("enroll-key-1", "guess").token());

    let err = post(&h.enroller, Some(&header), json!({"type": "PERMANENT"})).await.unwrap_err();

    assert!(matches!(err, EnrollError::KeyMismatch));
    assert!(h.issuer.calls().is_empty());
}

#[tokio::test]
async fn store_failure_during_lookup_names_operation() {
    let h = harness();
    h.store.fail_next(StoreOp::Search, Fault::Unavailable);

    let err = h.send(&body(json!({"type": "PERMANENT"}))).await.unwrap_err();

    assert!(matches!(err, EnrollError::Store { op: "fetch enrollment api key", .. }));
}

#[tokio::test]
async fn mint_failure_leaves_no_agent() {
    let h = harness();
    h.issuer.fail_next();

    let err = h.send(&body(json!({"type": "PERMANENT"}))).await.unwrap_err();

    assert!(matches!(err, EnrollError::Issuer(_)));
    assert!(h.store.is_empty(FLEET_AGENTS));
}

#[tokio::test]
async fn persistence_failure_orphans_access_key() {
    let h = harness();
    h.store.fail_next(StoreOp::Create, Fault::Unavailable);

    let err = h.send(&body(json!({"type": "PERMANENT"}))).await.unwrap_err();

    assert!(matches!(err, EnrollError::Store { op: "create agent", .. }));
    assert_eq!(h.issuer.calls().len(), 1);
    assert!(h.store.is_empty(FLEET_AGENTS));
    assert!(h.enroller.cache().get_api_key("key-1").is_none());
}

#[tokio::test]
async fn agent_id_collision_is_not_overwritten() {
    let h = harness();
    h.store.insert(FLEET_AGENTS, "agent-1", json!({"active": false}));

    let err = h.send(&body(json!({"type": "PERMANENT"}))).await.unwrap_err();

    assert!(matches!(err, EnrollError::Store { source: StoreError::Conflict { .. }, .. }));
    assert_eq!(h.store.get(FLEET_AGENTS, "agent-1").unwrap().source, json!({"active": false}));
}

#[tokio::test]
async fn cancelled_request_does_no_work() {
    let h = harness();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h
        .enroller
        .handle_enroll(Some(&auth()), Some(AGENT), &body(json!({"type": "PERMANENT"})), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, EnrollError::Cancelled));
    assert_eq!(h.store.calls().writes(), 0);
    assert!(h.issuer.calls().is_empty());
}

#[tokio::test]
async fn missing_header_is_unauthorized_and_releases_slot() {
    let mut config = Config::default();
    config.limits.enroll.max = 1;
    let h = harness_with(config);

    for _ in 0..3 {
        let err = post(&h.enroller, None, json!({"type": "PERMANENT"})).await.unwrap_err();
        assert!(matches!(err, EnrollError::Auth(_)));
    }
    assert_eq!(h.enroller.limiter().available(), Some(1));
}

#[tokio::test(start_paused = true)]
async fn saturated_limiter_sheds_load() {
    let mut config = Config::default();
    config.limits.enroll.max = 1;
    let h = harness_with(config);
    h.store.set_latency(Duration::from_secs(1));
    let enroller = Arc::new(h.enroller);

    let first = {
        let enroller = Arc::clone(&enroller);
        tokio::spawn(async move {
            post(&enroller, Some(&auth()), json!({"type": "PERMANENT"})).await
        })
    };
    while enroller.limiter().available() != Some(0) {
        tokio::task::yield_now().await;
    }

    let err = post(&enroller, Some(&auth()), json!({"type": "PERMANENT"})).await.unwrap_err();
    assert!(matches!(err, EnrollError::Limit(LimitError::MaxInFlight)));
    assert_eq!(h.issuer.calls().len(), 0);

    first.await.unwrap().unwrap();
    assert_eq!(enroller.limiter().available(), Some(1));
}

#[tokio::test]
async fn rate_limit_rejects_burst_overflow() {
    let mut config = Config::default();
    config.limits.enroll.interval_ms = Duration::from_secs(3600);
    config.limits.enroll.burst = 1;
    let h = harness_with(config);

    h.send(&body(json!({"type": "PERMANENT"}))).await.unwrap();
    let err = h.send(&body(json!({"type": "PERMANENT"}))).await.unwrap_err();

    assert!(matches!(err, EnrollError::Limit(LimitError::RateLimited)));
}

#[tokio::test]
async fn concurrent_enrollments_with_one_key_are_independent() {
    let store = MemoryStore::new();
    seed_key(&store, &EnrollmentApiKey::builder().build());
    let enroller = Arc::new(Enroller::new(
        store.clone(),
        FakeCredentialIssuer::new(),
        FakeClock::new(),
        &Config::default(),
    ));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let enroller = Arc::clone(&enroller);
            tokio::spawn(async move {
            post(&enroller, Some(&auth()), json!({"type": "EPHEMERAL"})).await
        })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        let data = task.await.unwrap().unwrap();
        let resp: EnrollResponse = serde_json::from_slice(&data).unwrap();
        ids.push(resp.item.id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert_eq!(store.len(FLEET_AGENTS), 4);
}

#[test]
fn decode_accepts_metadata_blobs() {
    let req = decode_enroll_request(&body(json!({
        "type": "TEMPORARY",
        "metadata": {"user_provided": {"a": 1}, "local": {"b": 2}},
    })))
    .unwrap();
    assert_eq!(req.enroll_type, EnrollType::Temporary);
    assert!(req.shared_id.is_empty());
    assert_eq!(req.metadata.user_provided, Some(json!({"a": 1})));
    assert_eq!(req.metadata.local, Some(json!({"b": 2})));
}

#[tokio::test]
async fn user_agent_outside_requirement_is_rejected_before_minting() {
    let cases: [(Option<&str>, ErrorCategory); 4] = [
        (None, ErrorCategory::InvalidUserAgent),
        (Some("curl/8.4.0"), ErrorCategory::InvalidUserAgent),
        (Some("Elastic Agent vlatest"), ErrorCategory::InvalidUserAgent),
        (Some("Elastic Agent v7.12.0"), ErrorCategory::UnsupportedVersion),
    ];
    for (user_agent, category) in cases {
        let h = harness();

        let err = h
            .enroller
            .handle_enroll(
                Some(&auth()),
                user_agent,
                &body(json!({"type": "PERMANENT"})),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EnrollError::UserAgent(_)), "{user_agent:?}: {err}");
        let api = ApiError::from(&err);
        assert_eq!((api.status, api.category), (400, category), "{user_agent:?}");
        assert!(h.issuer.calls().is_empty());
        assert_eq!(h.store.calls().writes(), 0);
    }
}

#[tokio::test]
async fn user_agent_is_checked_after_the_key() {
    let h = harness();
    let header = format!("ApiKey {}", ApiKey::new("nobody", "secret").token());

    let err = h
        .enroller
        .handle_enroll(
            Some(&header),
            Some("curl/8.4.0"),
            &body(json!({"type": "PERMANENT"})),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EnrollError::KeyNotFound));
}

#[tokio::test]
async fn configured_agent_version_bounds_enrollment() {
    let mut config = Config::default();
    config.server.agent_version = semver::VersionReq::parse(">=8.0.0, <8.2.0").unwrap();
    let h = harness_with(config);

    for (agent, accepted) in [
        ("Elastic Agent v7.17.0", false),
        ("Elastic Agent v8.0.0", true),
        ("Elastic Agent v8.1.3-SNAPSHOT", true),
        ("Elastic Agent v8.2.0", false),
    ] {
        let result = h
            .enroller
            .handle_enroll(
                Some(&auth()),
                Some(agent),
                &body(json!({"type": "PERMANENT"})),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(result.is_ok(), accepted, "{agent}");
    }
    assert_eq!(h.issuer.calls().len(), 2);
}
