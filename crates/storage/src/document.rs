// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Per-document version. Any successful write yields a new, larger value.
pub type SeqNo = u64;

/// A stored document as returned by reads and searches.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub seq_no: SeqNo,
    pub source: Value,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.source)
    }
}

/// Hits returned by a search, in document key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub hits: Vec<Document>,
    pub total: u64,
}

/// Result of a write that reached the store.
///
/// A version conflict is not an error at this layer: callers decide what
/// it means for their operation.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied { seq_no: SeqNo },
    VersionConflict,
}

/// Visibility of a write (or freshness of a read) relative to searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Refresh {
    #[default]
    None,
    /// Make the write visible to subsequent reads and searches before returning.
    WaitFor,
}
