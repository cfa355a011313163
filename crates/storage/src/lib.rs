// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the fleet coordination core
//!
//! A versioned document store is the only point of coordination between
//! server replicas. Writes report version conflicts as a distinct outcome
//! so callers can decide per operation whether a conflict is an error.

mod document;
pub mod index;
mod memory;
mod query;
pub mod records;
mod store;

pub use document::{Document, Refresh, SearchResult, SeqNo, WriteOutcome};
#[cfg(any(test, feature = "test-support"))]
pub use memory::{Fault, StoreOp};
pub use memory::{CallCounts, MemoryStore};
pub use query::{Query, QueryTemplate};
pub use store::{DocumentStore, StoreError};
