// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Index and field names.

pub const FLEET_AGENTS: &str = ".fleet-agents";
pub const FLEET_ENROLLMENT_API_KEYS: &str = ".fleet-enrollment-api-keys";
pub const FLEET_POLICIES_LEADER: &str = ".fleet-policies-leader";
pub const FLEET_API_KEYS: &str = ".fleet-api-keys";

/// Document key pseudo-field.
pub const FIELD_ID: &str = "_id";
pub const FIELD_API_KEY_ID: &str = "api_key_id";
