// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process document store.
//!
//! Keeps the optimistic concurrency contract of the real store: every
//! write bumps a store-wide sequence number, and conditional updates
//! compare against the sequence number the caller read.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
#[cfg(any(test, feature = "test-support"))]
use std::time::Duration;

use crate::document::{Document, Refresh, SearchResult, SeqNo, WriteOutcome};
use crate::query::Query;
use crate::store::{DocumentStore, StoreError};

/// Number of calls made through the [`DocumentStore`] trait, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create: usize,
    pub read: usize,
    pub update: usize,
    pub search: usize,
}

impl CallCounts {
    pub fn writes(&self) -> usize {
        self.create + self.update
    }
}

/// Store operation, for call counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Create,
    Read,
    Update,
    Search,
}

/// Injected failure for the next call of an operation.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// Report a version conflict without writing (writes only).
    Conflict,
    /// Fail with [`StoreError::Unavailable`].
    Unavailable,
}

#[derive(Debug, Clone)]
struct Stored {
    seq_no: SeqNo,
    source: Value,
}

#[derive(Default)]
struct MemoryState {
    indices: HashMap<String, BTreeMap<String, Stored>>,
    seq_no: SeqNo,
    calls: CallCounts,
    #[cfg(any(test, feature = "test-support"))]
    faults: Vec<(StoreOp, Fault)>,
    #[cfg(any(test, feature = "test-support"))]
    latency: Option<Duration>,
}

impl MemoryState {
    fn next_seq_no(&mut self) -> SeqNo {
        self.seq_no += 1;
        self.seq_no
    }

    #[cfg(any(test, feature = "test-support"))]
    fn take_fault(&mut self, op: StoreOp) -> Option<Fault> {
        let pos = self.faults.iter().position(|(o, _)| *o == op)?;
        Some(self.faults.remove(pos).1)
    }

    fn count(&mut self, op: StoreOp) {
        match op {
            StoreOp::Create => self.calls.create += 1,
            StoreOp::Read => self.calls.read += 1,
            StoreOp::Update => self.calls.update += 1,
            StoreOp::Search => self.calls.search += 1,
        }
    }
}

/// Thread-safe in-memory [`DocumentStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls made through the store trait so far.
    pub fn calls(&self) -> CallCounts {
        self.inner.lock().calls
    }

    /// Seed a document directly, bypassing call counting.
    pub fn insert(&self, index: &str, id: &str, source: Value) -> SeqNo {
        let mut state = self.inner.lock();
        let seq_no = state.next_seq_no();
        state
            .indices
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), Stored { seq_no, source });
        seq_no
    }

    /// Inspect a document directly, bypassing call counting.
    pub fn get(&self, index: &str, id: &str) -> Option<Document> {
        let state = self.inner.lock();
        state.indices.get(index).and_then(|docs| docs.get(id)).map(|stored| Document {
            id: id.to_string(),
            seq_no: stored.seq_no,
            source: stored.source.clone(),
        })
    }

    /// Number of documents in `index`.
    pub fn len(&self, index: &str) -> usize {
        self.inner.lock().indices.get(index).map(BTreeMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }

    /// Fail the next call of `op` with `fault`. Faults queue in order.
    #[cfg(any(test, feature = "test-support"))]
    pub fn fail_next(&self, op: StoreOp, fault: Fault) {
        self.inner.lock().faults.push((op, fault));
    }

    /// Delay every trait call, to exercise cancellation.
    #[cfg(any(test, feature = "test-support"))]
    pub fn set_latency(&self, latency: Duration) {
        self.inner.lock().latency = Some(latency);
    }

    /// Count the call. Under test support, also apply injected latency and
    /// turn an injected fault into the call's result: a conflict on a write
    /// becomes its outcome, anything else fails the call.
    async fn enter(&self, op: StoreOp) -> Result<Option<WriteOutcome>, StoreError> {
        self.inner.lock().count(op);

        #[cfg(any(test, feature = "test-support"))]
        {
            let latency = self.inner.lock().latency;
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            let fault = self.inner.lock().take_fault(op);
            match (fault, op) {
                (None, _) => {}
                (Some(Fault::Conflict), StoreOp::Create | StoreOp::Update) => {
                    return Ok(Some(WriteOutcome::VersionConflict));
                }
                (Some(fault), _) => {
                    tracing::debug!(?op, ?fault, "injected store fault");
                    return Err(StoreError::Unavailable(format!("injected fault on {op:?}")));
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(
        &self,
        index: &str,
        id: &str,
        body: Value,
        _refresh: Refresh,
    ) -> Result<WriteOutcome, StoreError> {
        if let Some(outcome) = self.enter(StoreOp::Create).await? {
            return Ok(outcome);
        }

        let mut state = self.inner.lock();
        let exists = state.indices.get(index).is_some_and(|docs| docs.contains_key(id));
        if exists {
            tracing::debug!(index, id, "create conflict: document exists");
            return Ok(WriteOutcome::VersionConflict);
        }
        let seq_no = state.next_seq_no();
        state
            .indices
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), Stored { seq_no, source: body });
        Ok(WriteOutcome::Applied { seq_no })
    }

    async fn read(
        &self,
        index: &str,
        id: &str,
        _refresh: Refresh,
    ) -> Result<Option<Document>, StoreError> {
        self.enter(StoreOp::Read).await?;
        Ok(self.get(index, id))
    }

    async fn update(
        &self,
        index: &str,
        id: &str,
        doc: Value,
        if_seq_no: Option<SeqNo>,
        _refresh: Refresh,
    ) -> Result<WriteOutcome, StoreError> {
        if let Some(outcome) = self.enter(StoreOp::Update).await? {
            return Ok(outcome);
        }

        let Value::Object(fields) = doc else {
            return Err(StoreError::InvalidBody { index: index.to_string(), id: id.to_string() });
        };

        let mut state = self.inner.lock();
        let current = state
            .indices
            .get(index)
            .and_then(|docs| docs.get(id))
            .map(|stored| stored.seq_no)
            .ok_or_else(|| StoreError::NotFound { index: index.to_string(), id: id.to_string() })?;

        if if_seq_no.is_some_and(|expected| expected != current) {
            tracing::debug!(index, id, current, ?if_seq_no, "update conflict: stale seq_no");
            return Ok(WriteOutcome::VersionConflict);
        }

        let seq_no = state.next_seq_no();
        if let Some(stored) = state.indices.get_mut(index).and_then(|docs| docs.get_mut(id)) {
            match &mut stored.source {
                Value::Object(existing) => existing.extend(fields),
                other => *other = Value::Object(fields),
            }
            stored.seq_no = seq_no;
        }
        Ok(WriteOutcome::Applied { seq_no })
    }

    async fn search(&self, index: &str, query: &Query) -> Result<SearchResult, StoreError> {
        self.enter(StoreOp::Search).await?;

        let state = self.inner.lock();
        let matched: Vec<Document> = state
            .indices
            .get(index)
            .into_iter()
            .flat_map(|docs| docs.iter())
            .filter(|(id, stored)| query.matches(id, &stored.source))
            .map(|(id, stored)| Document {
                id: id.clone(),
                seq_no: stored.seq_no,
                source: stored.source.clone(),
            })
            .collect();

        let total = matched.len() as u64;
        let hits = match query.size() {
            Some(size) => matched.into_iter().take(size).collect(),
            None => matched,
        };
        Ok(SearchResult { hits, total })
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
