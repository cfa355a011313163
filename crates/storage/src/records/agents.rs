// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use fleet_core::{Agent, AgentId};

use crate::document::{Refresh, SeqNo, WriteOutcome};
use crate::index::FLEET_AGENTS;
use crate::store::{DocumentStore, StoreError};

/// Persist a new agent under its id, visible to reads on return.
///
/// An existing agent with the same id is never overwritten.
pub async fn create_agent<S: DocumentStore>(store: &S, agent: &Agent) -> Result<SeqNo, StoreError> {
    let body = serde_json::to_value(agent)?;
    match store.create(FLEET_AGENTS, &agent.id, body, Refresh::WaitFor).await? {
        WriteOutcome::Applied { seq_no } => Ok(seq_no),
        WriteOutcome::VersionConflict => Err(StoreError::Conflict {
            index: FLEET_AGENTS.to_string(),
            id: agent.id.to_string(),
        }),
    }
}

pub async fn get_agent<S: DocumentStore>(
    store: &S,
    id: &AgentId,
) -> Result<Option<Agent>, StoreError> {
    let Some(doc) = store.read(FLEET_AGENTS, id, Refresh::WaitFor).await? else {
        return Ok(None);
    };
    let mut agent: Agent = doc.decode().map_err(|source| StoreError::Decode {
        index: FLEET_AGENTS.to_string(),
        id: doc.id.clone(),
        source,
    })?;
    agent.id = AgentId::new(doc.id);
    Ok(Some(agent))
}
