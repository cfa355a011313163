// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon error types and their boundary representation.

use fleet_adapters::{AuthError, IssuerError, LimitError};
use fleet_storage::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::Level;

use crate::user_agent::UserAgentError;

/// Errors from the enroll flow.
#[derive(Debug, Error)]
pub enum EnrollError {
    #[error(transparent)]
    Limit(#[from] LimitError),
    #[error("unauthorized: {0}")]
    Auth(#[from] AuthError),
    #[error("enrollment api key not found")]
    KeyNotFound,
    #[error("enrollment api key is inactive")]
    InactiveKey,
    #[error("presented key does not match the enrollment api key")]
    KeyMismatch,
    #[error(transparent)]
    UserAgent(#[from] UserAgentError),
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
    #[error("malformed enroll request: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("unknown enroll request type: {0:?}")]
    UnknownEnrollType(String),
    #[error("preexisting install not yet supported")]
    SharedIdUnsupported,
    #[error("enroll cancelled")]
    Cancelled,
    #[error("failed to {op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("failed to mint access api key: {0}")]
    Issuer(#[source] IssuerError),
    #[error("failed to encode enroll response: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors from lease operations.
#[derive(Debug, Error)]
pub enum LeadershipError {
    #[error("failed to {op} lease for policy {policy_id}: {source}")]
    Store {
        op: &'static str,
        policy_id: String,
        #[source]
        source: StoreError,
    },
    #[error("undecodable lease for policy {policy_id}: {source}")]
    Decode {
        policy_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode lease: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("lease for policy {0} was created concurrently by another server")]
    Contended(String),
    #[error("lease operation cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    BadRequest,
    InvalidUserAgent,
    UnsupportedVersion,
    Unauthorized,
    BodyTooLarge,
    RateLimit,
    MaxLimit,
    Cancelled,
    InternalServerError,
}

fleet_core::simple_display! {
    ErrorCategory {
        BadRequest => "BadRequest",
        InvalidUserAgent => "InvalidUserAgent",
        UnsupportedVersion => "UnsupportedVersion",
        Unauthorized => "Unauthorized",
        BodyTooLarge => "BodyTooLarge",
        RateLimit => "RateLimit",
        MaxLimit => "MaxLimit",
        Cancelled => "Cancelled",
        InternalServerError => "InternalServerError",
    }
}

/// What a caller sees for a failed request: `(status, category, message)`,
/// plus the level the failure is logged at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub category: ErrorCategory,
    pub message: String,
    pub level: Level,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    #[serde(rename = "statusCode")]
    status_code: u16,
    error: String,
    message: &'a str,
}

impl ApiError {
    fn new(status: u16, category: ErrorCategory, message: impl Into<String>, level: Level) -> Self {
        Self { status, category, message: message.into(), level }
    }

    /// JSON error envelope: `{"statusCode", "error", "message"}`.
    pub fn body(&self) -> serde_json::Value {
        serde_json::to_value(ErrorBody {
            status_code: self.status,
            error: self.category.to_string(),
            message: &self.message,
        })
        .unwrap_or_default()
    }
}

impl From<&EnrollError> for ApiError {
    fn from(err: &EnrollError) -> Self {
        use ErrorCategory::*;
        match err {
            EnrollError::Limit(LimitError::RateLimited) => {
                Self::new(429, RateLimit, err.to_string(), Level::DEBUG)
            }
            EnrollError::Limit(LimitError::MaxInFlight) => {
                Self::new(429, MaxLimit, err.to_string(), Level::DEBUG)
            }
            EnrollError::Auth(_)
            | EnrollError::KeyNotFound
            | EnrollError::InactiveKey
            | EnrollError::KeyMismatch => {
                Self::new(401, Unauthorized, err.to_string(), Level::INFO)
            }
            EnrollError::UserAgent(UserAgentError::Invalid(_)) => {
                Self::new(400, InvalidUserAgent, err.to_string(), Level::INFO)
            }
            EnrollError::UserAgent(UserAgentError::Unsupported { .. }) => {
                Self::new(400, UnsupportedVersion, err.to_string(), Level::INFO)
            }
            EnrollError::BodyTooLarge { .. } => {
                Self::new(413, BodyTooLarge, err.to_string(), Level::INFO)
            }
            EnrollError::Malformed(_)
            | EnrollError::UnknownEnrollType(_)
            | EnrollError::SharedIdUnsupported => {
                Self::new(400, BadRequest, err.to_string(), Level::INFO)
            }
            EnrollError::Cancelled => Self::new(499, Cancelled, err.to_string(), Level::DEBUG),
            // Internal payloads stay in the log, the caller only learns the operation.
            EnrollError::Store { op, .. } => {
                Self::new(500, InternalServerError, format!("failed to {op}"), Level::ERROR)
            }
            EnrollError::Issuer(_) => Self::new(
                500,
                InternalServerError,
                "failed to mint access api key",
                Level::ERROR,
            ),
            EnrollError::Encode(_) => Self::new(
                500,
                InternalServerError,
                "failed to encode enroll response",
                Level::ERROR,
            ),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
