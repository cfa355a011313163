// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enrolled agent record as persisted in the agents index.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

crate::define_id! {
    /// Identity of an enrolled agent. Doubles as the agent document key.
    pub struct AgentId;
}

crate::define_id! {
    /// Identity of a policy. Doubles as the policy-leader document key.
    pub struct PolicyId;
}

/// Sentinel for "no action sequence number observed yet".
pub const UNDEFINED_SEQ_NO: i64 = -1;

/// How long an agent is expected to live.
///
/// Serialized as the exact upper-case strings; anything else fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnrollType {
    Ephemeral,
    Permanent,
    Temporary,
}

crate::simple_display! {
    EnrollType {
        Ephemeral => "EPHEMERAL",
        Permanent => "PERMANENT",
        Temporary => "TEMPORARY",
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown enroll type: {0:?}")]
pub struct UnknownEnrollType(pub String);

impl std::str::FromStr for EnrollType {
    type Err = UnknownEnrollType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EPHEMERAL" => Ok(Self::Ephemeral),
            "PERMANENT" => Ok(Self::Permanent),
            "TEMPORARY" => Ok(Self::Temporary),
            other => Err(UnknownEnrollType(other.to_string())),
        }
    }
}

/// Identity record for an enrolled endpoint.
///
/// The id is the document key and is not part of the stored body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(skip)]
    pub id: AgentId,
    pub active: bool,
    pub policy_id: PolicyId,
    #[serde(rename = "type")]
    pub enroll_type: EnrollType,
    pub enrolled_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_provided_metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_metadata: Option<Value>,
    #[serde(default)]
    pub access_api_key_id: String,
    #[serde(default)]
    pub action_seq_no: Vec<i64>,
}

impl Agent {
    /// A freshly enrolled, active agent with no metadata and no access key.
    pub fn new(
        id: AgentId,
        policy_id: PolicyId,
        enroll_type: EnrollType,
        enrolled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            active: true,
            policy_id,
            enroll_type,
            enrolled_at: format_enrolled_at(enrolled_at),
            user_provided_metadata: None,
            local_metadata: None,
            access_api_key_id: String::new(),
            action_seq_no: vec![UNDEFINED_SEQ_NO],
        }
    }

    crate::setters! {
        into {
            access_api_key_id: String,
        }
        set {
            user_provided_metadata: Option<Value>,
            local_metadata: Option<Value>,
        }
    }
}

/// RFC 3339 at second precision with a `Z` suffix.
pub fn format_enrolled_at(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
