// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission control for expensive endpoints.
//!
//! Two independent bounds: a token-bucket rate (`interval` per token, up to
//! `burst` at once) and a cap on operations in flight (`max`). Acquisition
//! never waits; a saturated limiter sheds the request.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LimitError {
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("exceeded the max limit")]
    MaxInFlight,
}

/// A zero `interval` disables the rate bound; a zero `max` disables the
/// in-flight bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    pub interval: Duration,
    pub burst: u32,
    pub max: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self { interval: Duration::from_millis(10), burst: 100, max: 50 }
    }
}

impl LimitConfig {
    fleet_core::setters! {
        set {
            interval: Duration,
            burst: u32,
            max: usize,
        }
    }
}

/// Released on drop, so every exit path gives the slot back.
#[must_use = "dropping the guard releases the slot immediately"]
#[derive(Debug)]
pub struct LimitGuard {
    _permit: Option<OwnedSemaphorePermit>,
}

#[derive(Clone)]
pub struct Limiter {
    rate: Option<Arc<DefaultDirectRateLimiter>>,
    in_flight: Option<Arc<Semaphore>>,
}

impl Limiter {
    pub fn new(config: &LimitConfig) -> Self {
        let rate = Quota::with_period(config.interval).map(|quota| {
            let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);
            Arc::new(RateLimiter::direct(quota.allow_burst(burst)))
        });
        let in_flight = (config.max > 0).then(|| Arc::new(Semaphore::new(config.max)));
        Self { rate, in_flight }
    }

    pub fn acquire(&self) -> Result<LimitGuard, LimitError> {
        if let Some(rate) = &self.rate {
            rate.check().map_err(|_| LimitError::RateLimited)?;
        }
        let permit = match &self.in_flight {
            Some(sem) => {
                Some(Arc::clone(sem).try_acquire_owned().map_err(|_| LimitError::MaxInFlight)?)
            }
            None => None,
        };
        Ok(LimitGuard { _permit: permit })
    }

    /// Free in-flight slots, or `None` when unbounded.
    pub fn available(&self) -> Option<usize> {
        self.in_flight.as_ref().map(|sem| sem.available_permits())
    }
}

#[cfg(test)]
#[path = "limit_tests.rs"]
mod tests;
