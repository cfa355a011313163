// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic driver for policy leadership.
//!
//! Every `renew_interval` the monitor looks up the leases for its policies
//! and claims each one that is unowned, stale, or already its own. On
//! shutdown it releases whatever it holds so another server can take over
//! without waiting out the lease.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use fleet_core::{Clock, PolicyId};
use fleet_storage::DocumentStore;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::LeadershipError;
use crate::leader::PolicyLeaderManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub server_id: String,
    pub version: String,
    pub policy_ids: Vec<PolicyId>,
    pub renew_interval: Duration,
    /// Leases older than this may be claimed
    pub lease_ttl: Duration,
    pub release_interval: Duration,
}

impl From<&Config> for MonitorSettings {
    fn from(config: &Config) -> Self {
        Self {
            server_id: config.server.id.clone(),
            version: config.server.version.clone(),
            policy_ids: config.leadership.policy_ids.iter().map(PolicyId::new).collect(),
            renew_interval: config.leadership.renew_interval_ms,
            lease_ttl: config.leadership.lease_ttl_ms,
            release_interval: config.leadership.release_interval_ms,
        }
    }
}

pub struct LeadershipMonitor<S, C> {
    leader: PolicyLeaderManager<S, C>,
    clock: C,
    settings: MonitorSettings,
    held: Arc<Mutex<BTreeSet<PolicyId>>>,
}

impl<S: DocumentStore, C: Clock> LeadershipMonitor<S, C> {
    pub fn new(store: S, clock: C, settings: MonitorSettings) -> Self {
        Self {
            leader: PolicyLeaderManager::new(store, clock.clone()),
            clock,
            settings,
            held: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// Policies this server currently believes it leads.
    pub fn held(&self) -> Vec<PolicyId> {
        self.held.lock().iter().cloned().collect()
    }

    /// Run checks until `cancel` fires, then release held policies.
    pub async fn run(&self, cancel: &CancellationToken) {
        tracing::info!(
            server_id = %self.settings.server_id,
            policies = self.settings.policy_ids.len(),
            "leadership monitor started"
        );
        let period = self.settings.renew_interval.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            match self.check(cancel).await {
                Ok(()) => {}
                Err(LeadershipError::Cancelled) => break,
                Err(e) => tracing::warn!(error = %e, "leadership check failed"),
            }
        }

        self.release_all().await;
        tracing::info!("leadership monitor stopped");
    }

    /// One pass over the configured policies.
    pub async fn check(&self, cancel: &CancellationToken) -> Result<(), LeadershipError> {
        let leaders = self.leader.lookup_leaders(&self.settings.policy_ids, cancel).await?;
        let now = self.clock.utc_now();
        let server_id = self.settings.server_id.as_str();

        for policy_id in &self.settings.policy_ids {
            let claimable = match leaders.get(policy_id) {
                None => true,
                Some(lease) => {
                    lease.is_held_by(server_id) || lease.is_stale(now, self.settings.lease_ttl)
                }
            };
            if !claimable {
                if self.held.lock().remove(policy_id) {
                    tracing::info!(%policy_id, "lost policy leadership");
                }
                continue;
            }

            match self
                .leader
                .take_leadership(policy_id, server_id, &self.settings.version, cancel)
                .await
            {
                Ok(()) => {
                    if self.held.lock().insert(policy_id.clone()) {
                        tracing::info!(%policy_id, "acquired policy leadership");
                    }
                }
                Err(LeadershipError::Cancelled) => return Err(LeadershipError::Cancelled),
                Err(e) => {
                    self.held.lock().remove(policy_id);
                    tracing::warn!(%policy_id, error = %e, "failed to take policy leadership");
                }
            }
        }
        Ok(())
    }

    /// Release every held policy. Runs after shutdown, so it is not cancellable.
    pub async fn release_all(&self) {
        let held: Vec<PolicyId> = std::mem::take(&mut *self.held.lock()).into_iter().collect();
        let never = CancellationToken::new();
        for policy_id in held {
            let released = self
                .leader
                .release_leadership(
                    &policy_id,
                    &self.settings.server_id,
                    self.settings.release_interval,
                    &never,
                )
                .await;
            match released {
                Ok(()) => tracing::info!(%policy_id, "released policy leadership"),
                Err(e) => {
                    tracing::warn!(%policy_id, error = %e, "failed to release policy leadership")
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
