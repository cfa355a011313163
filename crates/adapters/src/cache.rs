// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared TTL cache with cost-based capacity.
//!
//! Every entry carries its own expiry and a cost. When an insert would push
//! the total cost over `max_cost`, expired entries go first, then the
//! entries closest to expiry.

use fleet_core::{ApiKey, Clock, EnrollmentApiKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const ENROLLMENT_KEY_PREFIX: &str = "enroll:";
const API_KEY_PREFIX: &str = "apikey:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Total cost the cache may hold.
    pub max_cost: u64,
    /// TTL used when a caller does not pass one.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_cost: 50 * 1024 * 1024, default_ttl: Duration::from_secs(60) }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    EnrollmentApiKey(EnrollmentApiKey),
    ApiKey(ApiKey),
}

#[derive(Debug)]
struct Slot {
    entry: Entry,
    cost: u64,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheState {
    slots: HashMap<String, Slot>,
    used: u64,
}

impl CacheState {
    fn remove(&mut self, key: &str) {
        if let Some(slot) = self.slots.remove(key) {
            self.used -= slot.cost;
        }
    }

    fn purge_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.remove(&key);
        }
    }

    fn evict_soonest(&mut self) -> bool {
        let victim = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.expires_at)
            .map(|(key, _)| key.clone());
        match victim {
            Some(key) => {
                self.remove(&key);
                true
            }
            None => false,
        }
    }
}

/// Cloneable handle to a cache shared by all enrollment tasks.
#[derive(Clone)]
pub struct Cache<C: Clock> {
    inner: Arc<RwLock<CacheState>>,
    clock: C,
    config: CacheConfig,
}

impl<C: Clock> Cache<C> {
    pub fn new(config: CacheConfig, clock: C) -> Self {
        Self { inner: Arc::new(RwLock::new(CacheState::default())), clock, config }
    }

    pub fn get_enrollment_api_key(&self, id: &str) -> Option<EnrollmentApiKey> {
        match self.get(&format!("{ENROLLMENT_KEY_PREFIX}{id}"))? {
            Entry::EnrollmentApiKey(rec) => Some(rec),
            Entry::ApiKey(_) => None,
        }
    }

    /// Cache an enrollment key record under its api key id.
    pub fn set_enrollment_api_key(
        &self,
        id: &str,
        rec: EnrollmentApiKey,
        cost: u64,
        ttl: Option<Duration>,
    ) -> bool {
        self.set(
            format!("{ENROLLMENT_KEY_PREFIX}{id}"),
            Entry::EnrollmentApiKey(rec),
            cost,
            ttl,
        )
    }

    pub fn get_api_key(&self, id: &str) -> Option<ApiKey> {
        match self.get(&format!("{API_KEY_PREFIX}{id}"))? {
            Entry::ApiKey(key) => Some(key),
            Entry::EnrollmentApiKey(_) => None,
        }
    }

    /// Cache a minted API key under its id; cost is the secret's length.
    pub fn set_api_key(&self, key: ApiKey, ttl: Option<Duration>) -> bool {
        let cost = key.key.len() as u64;
        self.set(format!("{API_KEY_PREFIX}{}", key.id), Entry::ApiKey(key), cost, ttl)
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.inner.read().slots.values().filter(|slot| slot.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total cost currently charged, including entries not yet purged.
    pub fn used_cost(&self) -> u64 {
        self.inner.read().used
    }

    fn get(&self, key: &str) -> Option<Entry> {
        let now = self.clock.now();
        let state = self.inner.read();
        let slot = state.slots.get(key)?;
        if slot.expires_at <= now {
            return None;
        }
        Some(slot.entry.clone())
    }

    fn set(&self, key: String, entry: Entry, cost: u64, ttl: Option<Duration>) -> bool {
        if cost > self.config.max_cost {
            tracing::debug!(%key, cost, max_cost = self.config.max_cost, "cache entry rejected");
            return false;
        }

        let now = self.clock.now();
        let expires_at = now + ttl.unwrap_or(self.config.default_ttl);

        let mut state = self.inner.write();
        state.remove(&key);
        if state.used + cost > self.config.max_cost {
            state.purge_expired(now);
        }
        while state.used + cost > self.config.max_cost {
            if !state.evict_soonest() {
                break;
            }
        }
        state.used += cost;
        state.slots.insert(key, Slot { entry, cost, expires_at });
        true
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
