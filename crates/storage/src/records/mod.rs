// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed access to fleet records on top of a [`DocumentStore`](crate::DocumentStore).

mod agents;
mod enrollment_keys;

pub use agents::{create_agent, get_agent};
pub use enrollment_keys::find_enrollment_api_key;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
