// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Config file path (`FLEET_CONFIG`)
pub fn config_path() -> Option<PathBuf> {
    std::env::var("FLEET_CONFIG").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Server id override (`FLEET_SERVER_ID`)
pub fn server_id() -> Option<String> {
    std::env::var("FLEET_SERVER_ID").ok().filter(|s| !s.is_empty())
}

/// Log filter directive override, e.g. `fleet_daemon=debug` (`FLEET_LOG`)
pub fn log_filter() -> Option<String> {
    std::env::var("FLEET_LOG").ok().filter(|s| !s.is_empty())
}

/// Comma-separated policy ids to coordinate (`FLEET_POLICY_IDS`)
pub fn policy_ids() -> Option<Vec<String>> {
    std::env::var("FLEET_POLICY_IDS").ok().map(|s| split_list(&s))
}

pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
