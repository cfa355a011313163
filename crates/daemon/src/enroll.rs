// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enrollment orchestrator.
//!
//! Admits an agent, resolves its enrollment key, mints an identity and an
//! access key, persists the agent and warms the cache. Steps run strictly in
//! that order. Minting happens before persistence, so a failure after it
//! leaves a live access key with no agent; nothing revokes it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fleet_adapters::{
    parse_authorization, ApiKeyMetadata, ApiKeyType, Cache, CredentialIssuer, Limiter,
};
use fleet_core::{
    patch_local_agent_id, Agent, AgentId, Clock, EnrollType, EnrollmentApiKey, IdGen, UuidIdGen,
};
use fleet_storage::records::{create_agent, find_enrollment_api_key};
use fleet_storage::{DocumentStore, StoreError};
use semver::VersionReq;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::Level;

use crate::cancel::until_cancelled;
use crate::config::Config;
use crate::error::{ApiError, EnrollError};
use crate::protocol::{EnrollRequest, EnrollResponse, RawEnrollRequest};
use crate::user_agent::validate_user_agent;

/// Tunables for the enroll flow, lifted out of [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollSettings {
    pub max_body_bytes: usize,
    pub enrollment_ttl: Duration,
    pub access_key_ttl: Duration,
    pub agent_version: VersionReq,
}

impl From<&Config> for EnrollSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_body_bytes: config.limits.enroll.max_body_bytes,
            enrollment_ttl: config.cache.enrollment_ttl_ms,
            access_key_ttl: config.cache.access_key_ttl_ms,
            agent_version: config.server.agent_version.clone(),
        }
    }
}

impl Default for EnrollSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Role document every access key is minted with. Grants nothing beyond
/// authenticating as the agent.
pub fn access_role_descriptors() -> Value {
    json!({
        "fleet-apikey-access": {
            "cluster": [],
            "applications": [{
                "application": ".fleet",
                "privileges": ["no-privileges"],
                "resources": ["*"],
            }],
        }
    })
}

/// Decode and validate an enroll request body.
pub fn decode_enroll_request(body: &[u8]) -> Result<EnrollRequest, EnrollError> {
    let raw: RawEnrollRequest = serde_json::from_slice(body).map_err(EnrollError::Malformed)?;
    let enroll_type = raw
        .enroll_type
        .parse::<EnrollType>()
        .map_err(|e| EnrollError::UnknownEnrollType(e.0))?;
    Ok(EnrollRequest { enroll_type, shared_id: raw.shared_id, metadata: raw.metadata })
}

pub struct Enroller<S, I, C: Clock> {
    store: S,
    issuer: I,
    cache: Cache<C>,
    limiter: Limiter,
    ids: Arc<dyn IdGen>,
    clock: C,
    roles: Value,
    settings: EnrollSettings,
}

impl<S, I, C> Enroller<S, I, C>
where
    S: DocumentStore,
    I: CredentialIssuer,
    C: Clock,
{
    pub fn new(store: S, issuer: I, clock: C, config: &Config) -> Self {
        let limits = config.limits.enroll.limiter();
        tracing::info!(
            ?limits,
            max_body_bytes = config.limits.enroll.max_body_bytes,
            "enroll limits"
        );
        Self {
            store,
            issuer,
            cache: Cache::new(config.cache.cache(), clock.clone()),
            limiter: Limiter::new(&limits),
            ids: Arc::new(UuidIdGen),
            clock,
            roles: access_role_descriptors(),
            settings: EnrollSettings::from(config),
        }
    }

    /// Replace the agent id source.
    pub fn with_id_gen(mut self, ids: impl IdGen) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn cache(&self) -> &Cache<C> {
        &self.cache
    }

    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    /// Serve one enroll request end to end, returning the encoded response.
    ///
    /// The admission slot is held for the whole request and released on
    /// every exit path. `user_agent` is checked once the key is authenticated.
    pub async fn handle_enroll(
        &self,
        authorization: Option<&str>,
        user_agent: Option<&str>,
        body: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, EnrollError> {
        let start = Instant::now();
        let result = self.process(authorization, user_agent, body, cancel).await;
        match &result {
            Ok(data) => {
                tracing::debug!(bytes = data.len(), elapsed = ?start.elapsed(), "enroll ok")
            }
            Err(e) => log_failure(e, start.elapsed()),
        }
        result
    }

    async fn process(
        &self,
        authorization: Option<&str>,
        user_agent: Option<&str>,
        body: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, EnrollError> {
        let _guard = self.limiter.acquire()?;

        let key = parse_authorization(authorization)?;
        let record = self.fetch_enrollment_key_record(&key.id, cancel).await?;
        if record.api_key != key.token() {
            return Err(EnrollError::KeyMismatch);
        }
        let agent_version = validate_user_agent(user_agent, &self.settings.agent_version)?;
        tracing::trace!(%agent_version, "agent version accepted");

        if body.len() > self.settings.max_body_bytes {
            return Err(EnrollError::BodyTooLarge { limit: self.settings.max_body_bytes });
        }
        let req = decode_enroll_request(body)?;

        let resp = self.enroll(req, &record, cancel).await?;
        serde_json::to_vec(&resp).map_err(EnrollError::Encode)
    }

    /// Resolve an enrollment key record by api key id, cache first.
    ///
    /// Only active records are cached.
    pub async fn fetch_enrollment_key_record(
        &self,
        api_key_id: &str,
        cancel: &CancellationToken,
    ) -> Result<EnrollmentApiKey, EnrollError> {
        if let Some(record) = self.cache.get_enrollment_api_key(api_key_id) {
            return Ok(record);
        }

        let found = until_cancelled(cancel, find_enrollment_api_key(&self.store, api_key_id))
            .await
            .ok_or(EnrollError::Cancelled)?;
        let record = match found {
            Ok(record) => record,
            Err(StoreError::NotFound { .. }) => return Err(EnrollError::KeyNotFound),
            Err(source) => {
                return Err(EnrollError::Store { op: "fetch enrollment api key", source })
            }
        };

        if !record.active {
            return Err(EnrollError::InactiveKey);
        }

        let cost = record.cost();
        self.cache.set_enrollment_api_key(
            api_key_id,
            record.clone(),
            cost,
            Some(self.settings.enrollment_ttl),
        );
        Ok(record)
    }

    /// Enroll a new agent under an already validated enrollment key.
    pub async fn enroll(
        &self,
        req: EnrollRequest,
        record: &EnrollmentApiKey,
        cancel: &CancellationToken,
    ) -> Result<EnrollResponse, EnrollError> {
        if !req.shared_id.is_empty() {
            return Err(EnrollError::SharedIdUnsupported);
        }

        let now = self.clock.utc_now();
        let agent_id = AgentId::new(self.ids.next_id());

        let metadata = ApiKeyMetadata::new(agent_id.as_str(), ApiKeyType::Access);
        let access_key =
            until_cancelled(cancel, self.issuer.mint(agent_id.as_str(), &self.roles, metadata))
                .await
                .ok_or(EnrollError::Cancelled)?
                .map_err(EnrollError::Issuer)?;

        let local = patch_local_agent_id(req.metadata.local, agent_id.as_str());
        let agent = Agent::new(agent_id, record.policy_id.clone(), req.enroll_type, now)
            .access_api_key_id(access_key.id.clone())
            .user_provided_metadata(req.metadata.user_provided)
            .local_metadata(local);

        until_cancelled(cancel, create_agent(&self.store, &agent))
            .await
            .ok_or(EnrollError::Cancelled)?
            .map_err(|source| EnrollError::Store { op: "create agent", source })?;

        // Covers the agent's first checkin.
        self.cache.set_api_key(access_key.clone(), Some(self.settings.access_key_ttl));

        tracing::info!(
            agent_id = %agent.id,
            policy_id = %agent.policy_id,
            enroll_type = %agent.enroll_type,
            "agent enrolled"
        );
        Ok(EnrollResponse::created(&agent, &access_key))
    }
}

fn log_failure(err: &EnrollError, elapsed: Duration) {
    let api = ApiError::from(err);
    let status = api.status;
    if api.level == Level::ERROR {
        tracing::error!(status, error = %err, ?elapsed, "enroll failed");
    } else if api.level == Level::WARN {
        tracing::warn!(status, error = %err, ?elapsed, "enroll failed");
    } else if api.level == Level::INFO {
        tracing::info!(status, error = %err, ?elapsed, "enroll failed");
    } else {
        tracing::debug!(status, error = %err, ?elapsed, "enroll failed");
    }
}

#[cfg(test)]
#[path = "enroll_tests.rs"]
mod tests;
