// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-policy leadership lease document.
//!
//! The document key is the policy id. A lease is "current" only while its
//! timestamp is recent; releasing rewrites the timestamp into the past
//! instead of deleting the document.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identity of a server replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMetadata {
    pub id: String,
    pub version: String,
}

/// Lease asserting which replica currently coordinates a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerMetadata>,
    #[serde(rename = "@timestamp", default)]
    pub timestamp: String,
}

impl PolicyLeader {
    pub fn new(
        server_id: impl Into<String>,
        version: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        let mut leader = Self {
            server: Some(ServerMetadata { id: server_id.into(), version: version.into() }),
            timestamp: String::new(),
        };
        leader.set_time(at);
        leader
    }

    /// Server id recorded on the lease, if any.
    pub fn server_id(&self) -> Option<&str> {
        self.server.as_ref().map(|s| s.id.as_str())
    }

    pub fn is_held_by(&self, server_id: &str) -> bool {
        self.server_id() == Some(server_id)
    }

    pub fn set_time(&mut self, at: DateTime<Utc>) {
        self.timestamp = at.to_rfc3339_opts(SecondsFormat::Nanos, true);
    }

    /// Parsed lease time. `None` when missing or unparseable.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp).ok().map(|t| t.with_timezone(&Utc))
    }

    /// True when the lease is older than `window` at `now`.
    ///
    /// A lease without a readable time is stale.
    pub fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let Some(at) = self.time() else {
            return true;
        };
        match chrono::Duration::from_std(window) {
            Ok(window) => now.signed_duration_since(at) > window,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "policy_leader_tests.rs"]
mod tests;
