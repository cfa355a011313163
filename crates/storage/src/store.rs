// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::document::{Document, Refresh, SearchResult, SeqNo, WriteOutcome};
use crate::query::Query;

/// Errors from document store operations.
///
/// Version conflicts are reported through [`WriteOutcome`], except where a
/// record helper decides a conflict is fatal ([`StoreError::Conflict`]).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {index}/{id}")]
    NotFound { index: String, id: String },

    #[error("document already exists: {index}/{id}")]
    Conflict { index: String, id: String },

    #[error("malformed document {index}/{id}")]
    Decode {
        index: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("update body for {index}/{id} must be a JSON object")]
    InvalidBody { index: String, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Create/read/update/search over versioned JSON documents.
///
/// Implementations must be safe to share across tasks; every call may
/// suspend on I/O.
#[async_trait]
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Create `id`; never overwrites. An existing id is a version conflict.
    async fn create(
        &self,
        index: &str,
        id: &str,
        body: Value,
        refresh: Refresh,
    ) -> Result<WriteOutcome, StoreError>;

    /// Read `id`. A missing document is `Ok(None)`.
    async fn read(
        &self,
        index: &str,
        id: &str,
        refresh: Refresh,
    ) -> Result<Option<Document>, StoreError>;

    /// Merge the top-level keys of `doc` into the stored document.
    ///
    /// With `if_seq_no`, the write only applies while the stored version is
    /// still that value; otherwise it reports a version conflict. A missing
    /// document is [`StoreError::NotFound`].
    async fn update(
        &self,
        index: &str,
        id: &str,
        doc: Value,
        if_seq_no: Option<SeqNo>,
        refresh: Refresh,
    ) -> Result<WriteOutcome, StoreError>;

    async fn search(&self, index: &str, query: &Query) -> Result<SearchResult, StoreError>;
}
