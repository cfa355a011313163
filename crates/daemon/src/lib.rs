// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet server daemon library
//!
//! The enrollment orchestrator, the policy-leadership lease manager and the
//! monitor that drives it, plus configuration and boundary errors.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod cancel;
pub mod config;
pub mod enroll;
pub mod env;
pub mod error;
pub mod leader;
pub mod logging;
pub mod monitor;
pub mod protocol;
pub mod user_agent;

pub use config::{Config, ConfigError};
pub use enroll::{access_role_descriptors, decode_enroll_request, EnrollSettings, Enroller};
pub use error::{ApiError, EnrollError, ErrorCategory, LeadershipError};
pub use leader::PolicyLeaderManager;
pub use monitor::{LeadershipMonitor, MonitorSettings};
pub use protocol::{EnrollMetadata, EnrollRequest, EnrollResponse, EnrollResponseItem};
pub use user_agent::{validate_user_agent, UserAgentError};
