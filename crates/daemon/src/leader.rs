// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy-leadership leases.
//!
//! One document per policy in the leader index records which server
//! currently coordinates it and when that was last asserted. Claims write
//! unconditionally; a concurrent claim may overwrite or be overwritten, and
//! consumers bound the overlap with a freshness window. Releases are
//! conditional on the version that was read, and a conflict there means
//! someone else already took over, which is the outcome a release wants.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleet_core::{Clock, PolicyId, PolicyLeader, ServerMetadata};
use fleet_storage::index::{FIELD_ID, FLEET_POLICIES_LEADER};
use fleet_storage::{Document, DocumentStore, QueryTemplate, Refresh, StoreError, WriteOutcome};
use tokio_util::sync::CancellationToken;

use crate::cancel::until_cancelled;
use crate::error::LeadershipError;

pub struct PolicyLeaderManager<S, C> {
    store: S,
    clock: C,
    by_ids: QueryTemplate,
}

impl<S: DocumentStore, C: Clock> PolicyLeaderManager<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock, by_ids: QueryTemplate::terms(FIELD_ID) }
    }

    /// Current leases for `policy_ids`. Policies without a lease are absent.
    pub async fn lookup_leaders(
        &self,
        policy_ids: &[PolicyId],
        cancel: &CancellationToken,
    ) -> Result<HashMap<PolicyId, PolicyLeader>, LeadershipError> {
        if policy_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = self.by_ids.render(policy_ids).with_size(policy_ids.len());
        let result = until_cancelled(cancel, self.store.search(FLEET_POLICIES_LEADER, &query))
            .await
            .ok_or(LeadershipError::Cancelled)?
            .map_err(|source| LeadershipError::Store {
                op: "search",
                policy_id: policy_ids.iter().map(PolicyId::as_str).collect::<Vec<_>>().join(","),
                source,
            })?;

        let mut leaders = HashMap::with_capacity(result.hits.len());
        for hit in result.hits {
            let leader = decode(&hit)?;
            leaders.insert(PolicyId::new(hit.id), leader);
        }
        Ok(leaders)
    }

    /// Claim `policy_id` for this server, creating the lease if needed.
    pub async fn take_leadership(
        &self,
        policy_id: &PolicyId,
        server_id: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<(), LeadershipError> {
        let existing = self.read(policy_id, cancel).await?;
        let now = self.clock.utc_now();

        let outcome = match existing {
            None => {
                let lease = PolicyLeader::new(server_id, version, now);
                let body = serde_json::to_value(&lease)?;
                let create =
                    self.store.create(FLEET_POLICIES_LEADER, policy_id, body, Refresh::None);
                until_cancelled(cancel, create)
                    .await
                    .ok_or(LeadershipError::Cancelled)?
                    .map_err(|source| store_error("create", policy_id, source))?
            }
            Some(doc) => {
                let mut lease = decode(&doc)?;
                lease.server = Some(ServerMetadata {
                    id: server_id.to_string(),
                    version: version.to_string(),
                });
                lease.set_time(now);
                let body = serde_json::to_value(&lease)?;
                let update =
                    self.store.update(FLEET_POLICIES_LEADER, policy_id, body, None, Refresh::None);
                until_cancelled(cancel, update)
                    .await
                    .ok_or(LeadershipError::Cancelled)?
                    .map_err(|source| store_error("update", policy_id, source))?
            }
        };

        match outcome {
            WriteOutcome::Applied { .. } => {
                tracing::debug!(%policy_id, server_id, "took policy leadership");
                Ok(())
            }
            WriteOutcome::VersionConflict => Err(LeadershipError::Contended(policy_id.to_string())),
        }
    }

    /// Give up `policy_id` if this server holds it.
    ///
    /// The lease time is backdated by `release_interval` so it reads as stale
    /// to every consumer.
    pub async fn release_leadership(
        &self,
        policy_id: &PolicyId,
        server_id: &str,
        release_interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), LeadershipError> {
        let Some(doc) = self.read(policy_id, cancel).await? else {
            return Ok(());
        };
        let mut lease = decode(&doc)?;
        if !lease.is_held_by(server_id) {
            tracing::debug!(
                %policy_id,
                server_id,
                holder = ?lease.server_id(),
                "not leader, nothing to release"
            );
            return Ok(());
        }

        lease.set_time(backdate(self.clock.utc_now(), release_interval));
        let body = serde_json::to_value(&lease)?;
        let update = self.store.update(
            FLEET_POLICIES_LEADER,
            policy_id,
            body,
            Some(doc.seq_no),
            Refresh::None,
        );
        let outcome = until_cancelled(cancel, update)
            .await
            .ok_or(LeadershipError::Cancelled)?
            .map_err(|source| store_error("update", policy_id, source))?;

        match outcome {
            WriteOutcome::Applied { .. } => {
                tracing::debug!(%policy_id, server_id, "released policy leadership")
            }
            WriteOutcome::VersionConflict => {
                tracing::debug!(%policy_id, server_id, "lease changed before release, taken over")
            }
        }
        Ok(())
    }

    async fn read(
        &self,
        policy_id: &PolicyId,
        cancel: &CancellationToken,
    ) -> Result<Option<Document>, LeadershipError> {
        until_cancelled(cancel, self.store.read(FLEET_POLICIES_LEADER, policy_id, Refresh::WaitFor))
            .await
            .ok_or(LeadershipError::Cancelled)?
            .map_err(|source| store_error("read", policy_id, source))
    }
}

fn decode(doc: &Document) -> Result<PolicyLeader, LeadershipError> {
    doc.decode().map_err(|source| LeadershipError::Decode { policy_id: doc.id.clone(), source })
}

fn store_error(op: &'static str, policy_id: &PolicyId, source: StoreError) -> LeadershipError {
    LeadershipError::Store { op, policy_id: policy_id.to_string(), source }
}

fn backdate(now: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|by| now.checked_sub_signed(by))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
#[path = "leader_tests.rs"]
mod tests;
