// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the specs.

pub use std::time::Duration;

pub use fleet_adapters::{FakeCredentialIssuer, StoreCredentialIssuer};
pub use fleet_core::{ApiKey, EnrollmentApiKey, FakeClock, PolicyId, PolicyLeader};
pub use fleet_daemon::{
    ApiError, Config, EnrollError, EnrollResponse, Enroller, ErrorCategory, LeadershipMonitor,
    MonitorSettings, PolicyLeaderManager,
};
pub use fleet_storage::index::{
    FLEET_AGENTS, FLEET_API_KEYS, FLEET_ENROLLMENT_API_KEYS, FLEET_POLICIES_LEADER,
};
pub use fleet_storage::{Fault, MemoryStore, StoreOp};
pub use serde_json::{json, Value};
pub use tokio_util::sync::CancellationToken;

/// The enrollment key every fleet starts with.
pub fn enrollment_key() -> EnrollmentApiKey {
    EnrollmentApiKey::builder().build()
}

/// `Authorization` header presenting [`enrollment_key`].
pub fn enroll_auth() -> String {
    format!("ApiKey {}", enrollment_key().api_key)
}

/// `User-Agent` of a supported agent release.
pub const AGENT_USER_AGENT: &str = "Elastic Agent v8.1.0";

pub fn seed_enrollment_key(store: &MemoryStore, record: &EnrollmentApiKey) {
    store.insert(FLEET_ENROLLMENT_API_KEYS, &record.id, serde_json::to_value(record).unwrap());
}

/// One server replica's view of a shared store.
pub struct Fleet<I> {
    pub store: MemoryStore,
    pub issuer: I,
    pub clock: FakeClock,
    pub enroller: Enroller<MemoryStore, I, FakeClock>,
}

impl Fleet<FakeCredentialIssuer> {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = MemoryStore::new();
        seed_enrollment_key(&store, &enrollment_key());
        let issuer = FakeCredentialIssuer::new();
        let clock = FakeClock::new();
        let enroller = Enroller::new(store.clone(), issuer.clone(), clock.clone(), &config);
        Self { store, issuer, clock, enroller }
    }
}

impl Fleet<StoreCredentialIssuer<MemoryStore>> {
    /// Fleet whose access keys are recorded in the store.
    pub fn with_store_issuer() -> Self {
        let store = MemoryStore::new();
        seed_enrollment_key(&store, &enrollment_key());
        let issuer = StoreCredentialIssuer::new(store.clone());
        let clock = FakeClock::new();
        let enroller =
            Enroller::new(store.clone(), issuer.clone(), clock.clone(), &Config::default());
        Self { store, issuer, clock, enroller }
    }
}

impl<I: fleet_adapters::CredentialIssuer> Fleet<I> {
    pub async fn enroll(&self, request: Value) -> Result<EnrollResponse, EnrollError> {
        let body = serde_json::to_vec(&request).unwrap();
        let data = self
            .enroller
            .handle_enroll(
                Some(&enroll_auth()),
                Some(AGENT_USER_AGENT),
                &body,
                &CancellationToken::new(),
            )
            .await?;
        Ok(serde_json::from_slice(&data).unwrap())
    }
}
