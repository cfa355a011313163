// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Loaded from a TOML file where every field has a default, then overlaid
//! with `FLEET_*` environment overrides. Durations are written in
//! milliseconds (`*_ms` keys).

use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_adapters::{CacheConfig, LimitConfig};
use semver::VersionReq;
use serde::Deserialize;
use thiserror::Error;

use crate::env;
use crate::user_agent::minimum_requirement;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub cache: CacheSettings,
    pub leadership: LeadershipConfig,
    pub logging: LoggingConfig,
}

/// Identity this replica records on leases, and the agents it will enroll.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub id: String,
    pub version: String,
    /// Versions an enrolling agent's `User-Agent` must satisfy
    pub agent_version: VersionReq,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            id: "fleet-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            agent_version: minimum_requirement(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub enroll: EnrollLimits,
}

/// Admission limits for the enroll endpoint. Zero disables a bound.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnrollLimits {
    #[serde(with = "millis")]
    pub interval_ms: Duration,
    pub burst: u32,
    pub max: usize,
    pub max_body_bytes: usize,
}

impl Default for EnrollLimits {
    fn default() -> Self {
        Self {
            interval_ms: Duration::from_millis(10),
            burst: 100,
            max: 50,
            max_body_bytes: MIB as usize,
        }
    }
}

impl EnrollLimits {
    pub fn limiter(&self) -> LimitConfig {
        LimitConfig::default().interval(self.interval_ms).burst(self.burst).max(self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub max_cost: u64,
    /// Lifetime of a cached enrollment key record
    #[serde(with = "millis")]
    pub enrollment_ttl_ms: Duration,
    /// Lifetime of a freshly minted access key; sized to cover the first checkin
    #[serde(with = "millis")]
    pub access_key_ttl_ms: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_cost: 50 * MIB,
            enrollment_ttl_ms: Duration::from_secs(30),
            access_key_ttl_ms: Duration::from_secs(30),
        }
    }
}

impl CacheSettings {
    pub fn cache(&self) -> CacheConfig {
        CacheConfig { max_cost: self.max_cost, default_ttl: self.enrollment_ttl_ms }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LeadershipConfig {
    /// Policies this replica competes for
    pub policy_ids: Vec<String>,
    #[serde(with = "millis")]
    pub renew_interval_ms: Duration,
    /// A lease older than this is up for grabs
    #[serde(with = "millis")]
    pub lease_ttl_ms: Duration,
    /// How far into the past a released lease is backdated
    #[serde(with = "millis")]
    pub release_interval_ms: Duration,
}

impl Default for LeadershipConfig {
    fn default() -> Self {
        Self {
            policy_ids: Vec::new(),
            renew_interval_ms: Duration::from_secs(30),
            lease_ttl_ms: Duration::from_secs(60),
            release_interval_ms: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive
    pub level: String,
    /// Append logs here instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None }
    }
}

impl Config {
    /// Load from `FLEET_CONFIG` when set, defaults otherwise, then apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(env::server_id(), env::policy_ids(), env::log_filter());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_overrides(
        &mut self,
        server_id: Option<String>,
        policy_ids: Option<Vec<String>>,
        log_filter: Option<String>,
    ) {
        if let Some(id) = server_id {
            self.server.id = id;
        }
        if let Some(ids) = policy_ids {
            self.leadership.policy_ids = ids;
        }
        if let Some(level) = log_filter {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.id.trim().is_empty() {
            return Err(ConfigError::Invalid("server.id must not be empty".to_string()));
        }
        if self.leadership.renew_interval_ms.is_zero() {
            return Err(ConfigError::Invalid(
                "leadership.renew_interval_ms must be > 0".to_string(),
            ));
        }
        if self.leadership.lease_ttl_ms <= self.leadership.renew_interval_ms {
            return Err(ConfigError::Invalid(
                "leadership.lease_ttl_ms must exceed leadership.renew_interval_ms".to_string(),
            ));
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        u64::deserialize(de).map(Duration::from_millis)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
