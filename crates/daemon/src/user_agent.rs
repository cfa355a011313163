// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent `User-Agent` gating.
//!
//! Agents identify as `Elastic Agent v<version>`. Enrollment is refused for
//! anything else, and for versions outside the configured requirement.

use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use thiserror::Error;

const PREFIX: &str = "elastic agent";

/// Oldest agent release this server can talk to.
pub const MINIMUM_AGENT_VERSION: Version = Version::new(7, 13, 0);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserAgentError {
    #[error("user agent is missing or malformed: {0:?}")]
    Invalid(String),
    #[error("agent version {version} is not supported, requires {required}")]
    Unsupported { version: Version, required: VersionReq },
}

/// Default requirement: `>=` [`MINIMUM_AGENT_VERSION`].
pub fn minimum_requirement() -> VersionReq {
    VersionReq {
        comparators: vec![Comparator {
            op: Op::GreaterEq,
            major: MINIMUM_AGENT_VERSION.major,
            minor: Some(MINIMUM_AGENT_VERSION.minor),
            patch: Some(MINIMUM_AGENT_VERSION.patch),
            pre: Prerelease::EMPTY,
        }],
    }
}

/// Extract the agent version from a `User-Agent` header.
///
/// The prefix is matched case-insensitively, the `v` is optional, and a
/// two-part `major.minor` is read as `major.minor.0`.
pub fn parse_user_agent(header: Option<&str>) -> Result<Version, UserAgentError> {
    let raw = header.unwrap_or_default();
    let invalid = || UserAgentError::Invalid(raw.to_string());

    let lowered = raw.trim().to_ascii_lowercase();
    let rest = lowered.strip_prefix(PREFIX).ok_or_else(invalid)?;
    let token = rest.split_whitespace().next().ok_or_else(invalid)?;
    let token = token.strip_prefix('v').unwrap_or(token);

    match Version::parse(token) {
        Ok(version) => Ok(version),
        Err(_) => Version::parse(&format!("{token}.0")).map_err(|_| invalid()),
    }
}

/// Check a `User-Agent` header against `required`.
///
/// Pre-release and build tags are ignored, so `8.1.0-SNAPSHOT` is judged
/// as `8.1.0`.
pub fn validate_user_agent(
    header: Option<&str>,
    required: &VersionReq,
) -> Result<Version, UserAgentError> {
    let version = parse_user_agent(header)?;
    let release = Version::new(version.major, version.minor, version.patch);
    if !required.matches(&release) {
        return Err(UserAgentError::Unsupported { version, required: required.clone() });
    }
    Ok(version)
}

#[cfg(test)]
#[path = "user_agent_tests.rs"]
mod tests;
