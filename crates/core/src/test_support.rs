// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use serde_json::{json, Value};

/// Proptest strategies for core model types.
pub mod strategies {
    use crate::EnrollType;
    use proptest::prelude::*;

    pub fn arb_enroll_type() -> impl Strategy<Value = EnrollType> {
        prop_oneof![
            Just(EnrollType::Ephemeral),
            Just(EnrollType::Permanent),
            Just(EnrollType::Temporary),
        ]
    }
}

/// Local metadata shaped like what an agent reports at enrollment.
pub fn local_metadata(agent_id: &str) -> Value {
    json!({
        "elastic": {
            "agent": {
                "id": agent_id,
                "version": "8.0.0",
                "snapshot": false,
                "upgradeable": false,
            }
        },
        "host": {
            "architecture": "x86_64",
            "hostname": "test-host",
            "id": agent_id,
        },
        "os": {
            "family": "linux",
            "platform": "ubuntu",
        }
    })
}
