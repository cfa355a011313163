// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enrollment credentials and minted API keys.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::PolicyId;

/// Pre-shared credential authorizing enrollment into one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentApiKey {
    /// Document key in the enrollment key index
    #[serde(skip)]
    pub id: String,
    /// Id of the underlying API key; the lookup key for enrollment
    pub api_key_id: String,
    /// Encoded key value. Its length is the cache cost of the record.
    pub api_key: String,
    #[serde(default)]
    pub name: String,
    pub active: bool,
    pub policy_id: PolicyId,
}

impl EnrollmentApiKey {
    /// Capacity units charged when the record is cached.
    pub fn cost(&self) -> u64 {
        self.api_key.len() as u64
    }
}

crate::builder! {
    pub struct EnrollmentApiKeyBuilder => EnrollmentApiKey {
        into {
            id: String = "enroll-doc-1",
            api_key_id: String = "enroll-key-1",
            api_key: String = "ZW5yb2xsLWtleS0xOnNlY3JldA==",
            name: String = "Default",
            policy_id: PolicyId = "policy-1",
        }
        set {
            active: bool = true,
        }
    }
}

/// Errors decoding an API key token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiKeyError {
    #[error("api key token is not valid base64")]
    Encoding,
    #[error("api key token is malformed")]
    Malformed,
}

/// A minted API key: its id plus the secret half.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub key: String,
}

impl ApiKey {
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self { id: id.into(), key: key.into() }
    }

    /// Bearer token presented by the holder: base64 of `id:key`.
    pub fn token(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.id, self.key))
    }

    /// Inverse of [`ApiKey::token`].
    pub fn parse_token(token: &str) -> Result<Self, ApiKeyError> {
        let raw = STANDARD.decode(token.trim()).map_err(|_| ApiKeyError::Encoding)?;
        let raw = String::from_utf8(raw).map_err(|_| ApiKeyError::Encoding)?;
        match raw.split_once(':') {
            Some((id, key)) if !id.is_empty() && !key.is_empty() => Ok(Self::new(id, key)),
            _ => Err(ApiKeyError::Malformed),
        }
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey").field("id", &self.id).field("key", &"<redacted>").finish()
    }
}

#[cfg(test)]
#[path = "api_key_tests.rs"]
mod tests;
