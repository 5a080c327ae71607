//! The engine's verdict for one admission check.

use serde::{Deserialize, Serialize};

/// Result of one rate limit check.
///
/// A denial is a normal decision, not an error: `remaining` and
/// `reset_at_ms` stay meaningful so callers can populate
/// `X-RateLimit-Remaining` / `Retry-After` style headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the operation may proceed.
    pub allowed: bool,
    /// Capacity left after this check. Algorithm-specific meaning: tokens
    /// for the bucket, unused window quota for the window algorithms.
    pub remaining: u64,
    /// Epoch milliseconds when full capacity is guaranteed available again.
    pub reset_at_ms: u64,
    /// Echo of the checked identifier.
    pub identifier: String,
}

impl Decision {
    pub fn allowed(remaining: u64, reset_at_ms: u64, identifier: impl Into<String>) -> Self {
        Self { allowed: true, remaining, reset_at_ms, identifier: identifier.into() }
    }

    pub fn denied(remaining: u64, reset_at_ms: u64, identifier: impl Into<String>) -> Self {
        Self { allowed: false, remaining, reset_at_ms, identifier: identifier.into() }
    }

    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}
