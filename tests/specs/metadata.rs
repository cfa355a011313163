// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local metadata specs
//!
//! Only `elastic.agent.id` is rewritten, and only when it is already there.

use crate::prelude::*;
use fleet_core::patch_local_agent_id;

#[test]
fn nested_agent_id_is_replaced() {
    let patched = patch_local_agent_id(Some(json!({"elastic": {"agent": {"id": "OLD"}}})), "NEW");
    similar_asserts::assert_eq!(patched, Some(json!({"elastic": {"agent": {"id": "NEW"}}})));
}

#[test]
fn blob_without_path_is_unchanged() {
    let blob = json!({"host": {"id": "OLD"}, "elastic": {"version": "8.0.0"}});
    similar_asserts::assert_eq!(patch_local_agent_id(Some(blob.clone()), "NEW"), Some(blob));
}

#[test]
fn absent_blob_stays_absent() {
    assert_eq!(patch_local_agent_id(None, "NEW"), None);
}

#[tokio::test]
async fn enrollment_patches_reported_metadata() {
    let fleet = Fleet::new();
    let local = fleet_core::test_support::local_metadata("OLD");

    let resp =
        fleet.enroll(json!({"type": "PERMANENT", "metadata": {"local": local}})).await.unwrap();

    let mut expected = fleet_core::test_support::local_metadata("OLD");
    expected["elastic"]["agent"]["id"] = json!(resp.item.id);
    similar_asserts::assert_eq!(resp.item.local_metadata, Some(expected.clone()));

    let stored = fleet.store.get(FLEET_AGENTS, &resp.item.id).unwrap();
    similar_asserts::assert_eq!(stored.source["local_metadata"], expected);
}
