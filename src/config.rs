//! Rate limit configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LimitError;

/// Parameters for one rate limit: at most `capacity` permits outstanding,
/// regenerated at `refill_rate` permits per `window`.
///
/// For the fixed and sliding window algorithms `capacity` is the per-window
/// limit and `refill_rate` is unused beyond validation.
///
/// Invariants: `capacity > 0`, `refill_rate > 0`, `window > 0`. Violations
/// are rejected with [`LimitError::InvalidConfig`] before any store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub capacity: u64,
    pub refill_rate: u64,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    /// Bootstrap defaults: 100 permits, refilled 10 per one-second window.
    fn default() -> Self {
        Self { capacity: 100, refill_rate: 10, window: Duration::from_secs(1) }
    }
}

impl RateLimitConfig {
    /// Build a validated config.
    pub fn new(capacity: u64, refill_rate: u64, window: Duration) -> Result<Self, LimitError> {
        let config = Self { capacity, refill_rate, window };
        config.validate()?;
        Ok(config)
    }

    /// Check the config invariants.
    pub fn validate(&self) -> Result<(), LimitError> {
        if self.capacity == 0 {
            return Err(LimitError::InvalidConfig { reason: "capacity must be positive".into() });
        }
        if self.refill_rate == 0 {
            return Err(LimitError::InvalidConfig { reason: "refill rate must be positive".into() });
        }
        if self.window.is_zero() {
            return Err(LimitError::InvalidConfig { reason: "window must be positive".into() });
        }
        Ok(())
    }

    pub(crate) fn window_millis(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }
}
