// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet-core: Domain model shared by the fleet coordination crates

pub mod macros;

pub mod agent;
pub mod api_key;
pub mod clock;
pub mod id;
pub mod metadata;
pub mod policy_leader;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::{Agent, AgentId, EnrollType, PolicyId, UnknownEnrollType, UNDEFINED_SEQ_NO};
pub use api_key::{ApiKey, ApiKeyError, EnrollmentApiKey};
pub use clock::{Clock, FakeClock, SystemClock};
#[cfg(any(test, feature = "test-support"))]
pub use id::SequentialIdGen;
pub use id::{IdGen, UuidIdGen};
pub use metadata::patch_local_agent_id;
pub use policy_leader::{PolicyLeader, ServerMetadata};
