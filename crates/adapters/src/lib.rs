// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the collaborators the coordination core depends on:
//! the TTL cache, the admission limiter, and the credential issuer.

pub mod cache;
pub mod credential;
pub mod limit;

pub use cache::{Cache, CacheConfig};
pub use credential::{
    parse_authorization, ApiKeyMetadata, ApiKeyType, AuthError, CredentialIssuer, IssuerError,
    StoreCredentialIssuer,
};
pub use limit::{LimitConfig, LimitError, LimitGuard, Limiter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use credential::{FakeCredentialIssuer, MintCall};
