//! Rate limiting algorithm strategies.
//!
//! Each strategy is a pure transition from (current state, config, now,
//! permits) to (new state, verdict). No I/O, no locking, no clock reads:
//! atomicity and time both come from the caller, so a transition can run
//! inside whatever atomic primitive a store adapter provides.
//!
//! Strategies are selected by [`AlgorithmKind`], a tag on a single engine,
//! not by separate limiter implementations per algorithm.

pub mod fixed_window;
pub mod sliding_window;
pub mod token_bucket;

use serde::{Deserialize, Serialize};

use crate::config::RateLimitConfig;
use crate::state::LimitState;

/// Selects which algorithm a check runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    #[default]
    TokenBucket,
    FixedWindow,
    SlidingWindow,
}

/// Outcome of one transition, before the engine attaches the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub remaining: u64,
    pub reset_at_ms: u64,
}

impl AlgorithmKind {
    /// Run this algorithm's transition against the key's current state.
    ///
    /// State written by a different algorithm is treated as absent rather
    /// than misread: the first check after switching algorithms re-creates
    /// the key's state.
    pub fn transition(
        self,
        current: Option<LimitState>,
        config: &RateLimitConfig,
        now_ms: u64,
        permits: u64,
    ) -> (LimitState, Verdict) {
        match self {
            Self::TokenBucket => {
                let current = current.and_then(|s| s.as_bucket());
                let (state, verdict) = token_bucket::transition(current, config, now_ms, permits);
                (LimitState::Bucket(state), verdict)
            }
            Self::FixedWindow => {
                let current = current.and_then(|s| s.as_window());
                let (state, verdict) = fixed_window::transition(current, config, now_ms, permits);
                (LimitState::Window(state), verdict)
            }
            Self::SlidingWindow => {
                let current = current.and_then(|s| s.as_sliding());
                let (state, verdict) = sliding_window::transition(current, config, now_ms, permits);
                (LimitState::Sliding(state), verdict)
            }
        }
    }
}
