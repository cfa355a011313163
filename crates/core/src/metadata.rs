// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local metadata patching.
//!
//! Agents report a free-form local metadata blob at enrollment. When it
//! carries the agent's own id at `elastic.agent.id`, that field is rewritten
//! to the id minted by the server:
//!
//! ```text
//! {
//!   "elastic": { "agent": { "id": "<rewritten>", "version": "8.0.0", ... } },
//!   "host":    { "hostname": "...", "id": "<left alone>" },
//!   "os":      { ... }
//! }
//! ```

use serde_json::Value;

/// Overwrite `elastic.agent.id` with `agent_id` if, and only if, that key
/// already exists. Every other field is preserved.
///
/// Absent or `null` metadata stays absent. A node of the wrong shape
/// anywhere along the path counts as "path absent".
pub fn patch_local_agent_id(local: Option<Value>, agent_id: &str) -> Option<Value> {
    let mut local = match local {
        None | Some(Value::Null) => return None,
        Some(v) => v,
    };

    if let Some(id) = local
        .get_mut("elastic")
        .and_then(|elastic| elastic.get_mut("agent"))
        .and_then(|agent| agent.as_object_mut())
        .and_then(|agent| agent.get_mut("id"))
    {
        *id = Value::String(agent_id.to_string());
    }

    Some(local)
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
