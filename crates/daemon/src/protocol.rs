// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the enroll endpoint.

use fleet_core::{Agent, ApiKey, EnrollType, PolicyId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action marker on a successful enrollment.
pub const ACTION_CREATED: &str = "created";
/// Status reported for a freshly enrolled agent.
pub const STATUS_ONLINE: &str = "online";

/// Metadata blobs supplied by the enrolling agent. Both are opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollMetadata {
    #[serde(default)]
    pub user_provided: Option<Value>,
    #[serde(default)]
    pub local: Option<Value>,
}

/// Request body as it arrives, before the enroll type is checked.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawEnrollRequest {
    #[serde(rename = "type", default)]
    pub enroll_type: String,
    #[serde(default)]
    pub shared_id: String,
    #[serde(default)]
    pub metadata: EnrollMetadata,
}

/// A decoded enroll request with a known enroll type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollRequest {
    pub enroll_type: EnrollType,
    /// Id of a pre-existing install. Must be empty.
    pub shared_id: String,
    pub metadata: EnrollMetadata,
}

impl EnrollRequest {
    pub fn new(enroll_type: EnrollType) -> Self {
        Self { enroll_type, shared_id: String::new(), metadata: EnrollMetadata::default() }
    }

    fleet_core::setters! {
        into {
            shared_id: String,
        }
        set {
            metadata: EnrollMetadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollResponse {
    pub action: String,
    pub item: EnrollResponseItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollResponseItem {
    pub id: String,
    pub active: bool,
    pub policy_id: PolicyId,
    #[serde(rename = "type")]
    pub enroll_type: EnrollType,
    pub enrolled_at: String,
    pub user_provided_metadata: Option<Value>,
    pub local_metadata: Option<Value>,
    pub access_api_key_id: String,
    /// Bearer token for the agent's subsequent requests
    pub access_api_key: String,
    pub status: String,
}

impl EnrollResponse {
    /// Response for a persisted agent and the access key minted for it.
    pub fn created(agent: &Agent, access_key: &ApiKey) -> Self {
        Self {
            action: ACTION_CREATED.to_string(),
            item: EnrollResponseItem {
                id: agent.id.to_string(),
                active: agent.active,
                policy_id: agent.policy_id.clone(),
                enroll_type: agent.enroll_type,
                enrolled_at: agent.enrolled_at.clone(),
                user_provided_metadata: agent.user_provided_metadata.clone(),
                local_metadata: agent.local_metadata.clone(),
                access_api_key_id: agent.access_api_key_id.clone(),
                access_api_key: access_key.token(),
                status: STATUS_ONLINE.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
