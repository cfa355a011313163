// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API key issuance and presentation.
//!
//! Agents authenticate with `Authorization: ApiKey <base64(id:key)>`. New
//! keys are minted scoped to an identity with a role document; the store
//! keeps only a digest of the secret half.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fleet_core::{ApiKey, ApiKeyError};
use fleet_storage::index::FLEET_API_KEYS;
use fleet_storage::{DocumentStore, Refresh, StoreError, WriteOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

const SCHEME: &str = "ApiKey";
const MANAGED_BY: &str = "fleet-server";

/// Errors from credential minting.
#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("api key id collision: {0}")]
    Collision(String),
    #[error("issuer rejected request: {0}")]
    Rejected(String),
}

/// Errors reading an `Authorization` header.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing authorization header")]
    Missing,
    #[error("unsupported authorization scheme")]
    Scheme,
    #[error("invalid api key: {0}")]
    Token(#[from] ApiKeyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyType {
    Access,
}

fleet_core::simple_display! {
    ApiKeyType {
        Access => "access",
    }
}

/// Metadata attached to every minted key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyMetadata {
    pub agent_id: String,
    #[serde(rename = "type")]
    pub key_type: ApiKeyType,
    pub managed_by: String,
    pub managed: bool,
}

impl ApiKeyMetadata {
    pub fn new(agent_id: impl Into<String>, key_type: ApiKeyType) -> Self {
        Self {
            agent_id: agent_id.into(),
            key_type,
            managed_by: MANAGED_BY.to_string(),
            managed: true,
        }
    }
}

/// Mints scoped API keys.
#[async_trait]
pub trait CredentialIssuer: Clone + Send + Sync + 'static {
    /// Mint a key named `name`, limited to `role_descriptors`.
    async fn mint(
        &self,
        name: &str,
        role_descriptors: &Value,
        metadata: ApiKeyMetadata,
    ) -> Result<ApiKey, IssuerError>;
}

/// Parse `ApiKey <token>`. The scheme is matched case-insensitively.
pub fn parse_authorization(header: Option<&str>) -> Result<ApiKey, AuthError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty()).ok_or(AuthError::Missing)?;
    let (scheme, token) = header.split_once(' ').ok_or(AuthError::Scheme)?;
    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return Err(AuthError::Scheme);
    }
    Ok(ApiKey::parse_token(token)?)
}

/// Issues keys by recording them in the document store.
#[derive(Clone)]
pub struct StoreCredentialIssuer<S> {
    store: S,
}

impl<S: DocumentStore> StoreCredentialIssuer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

fn digest(secret: &str) -> String {
    STANDARD.encode(Sha256::digest(secret.as_bytes()))
}

#[async_trait]
impl<S: DocumentStore> CredentialIssuer for StoreCredentialIssuer<S> {
    async fn mint(
        &self,
        name: &str,
        role_descriptors: &Value,
        metadata: ApiKeyMetadata,
    ) -> Result<ApiKey, IssuerError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let secret = uuid::Uuid::new_v4().simple().to_string();

        let body = json!({
            "name": name,
            "api_key_hash": digest(&secret),
            "role_descriptors": role_descriptors,
            "metadata": metadata,
            "creation": chrono::Utc::now().timestamp_millis(),
            "invalidated": false,
        });

        match self.store.create(FLEET_API_KEYS, &id, body, Refresh::WaitFor).await? {
            WriteOutcome::Applied { .. } => {
                tracing::debug!(
                    key_id = %id,
                    name,
                    key_type = %metadata.key_type,
                    "minted api key"
                );
                Ok(ApiKey::new(id, secret))
            }
            WriteOutcome::VersionConflict => Err(IssuerError::Collision(id)),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{ApiKeyMetadata, CredentialIssuer, IssuerError};
    use async_trait::async_trait;
    use fleet_core::ApiKey;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::Arc;

    /// Recorded mint request
    #[derive(Debug, Clone)]
    pub struct MintCall {
        pub name: String,
        pub role_descriptors: Value,
        pub metadata: ApiKeyMetadata,
    }

    #[derive(Default)]
    struct FakeIssuerState {
        calls: Vec<MintCall>,
        fail_next: bool,
    }

    /// Fake issuer for testing. Keys are `key-1`, `key-2`, ...
    #[derive(Clone, Default)]
    pub struct FakeCredentialIssuer {
        inner: Arc<Mutex<FakeIssuerState>>,
    }

    impl FakeCredentialIssuer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded mint requests, including failed ones
        pub fn calls(&self) -> Vec<MintCall> {
            self.inner.lock().calls.clone()
        }

        /// Reject the next mint request
        pub fn fail_next(&self) {
            self.inner.lock().fail_next = true;
        }
    }

    #[async_trait]
    impl CredentialIssuer for FakeCredentialIssuer {
        async fn mint(
            &self,
            name: &str,
            role_descriptors: &Value,
            metadata: ApiKeyMetadata,
        ) -> Result<ApiKey, IssuerError> {
            let mut state = self.inner.lock();
            state.calls.push(MintCall {
                name: name.to_string(),
                role_descriptors: role_descriptors.clone(),
                metadata,
            });
            if std::mem::take(&mut state.fail_next) {
                return Err(IssuerError::Rejected("injected failure".to_string()));
            }
            let n = state.calls.len();
            Ok(ApiKey::new(format!("key-{n}"), format!("secret-{n}")))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCredentialIssuer, MintCall};

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
