//! Per-key state blobs persisted by the store port.
//!
//! The port treats these as opaque: only the algorithm transitions read or
//! write the contents. Adapters own the wire encoding; the types here just
//! have to be encodable.

use serde::{Deserialize, Serialize};

/// Token bucket state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketState {
    /// Available permits, `0..=capacity`.
    pub tokens: u64,
    /// When the bucket was last refilled, epoch millis. Non-decreasing per
    /// key within the engine clock's timeline.
    pub last_refill_ms: u64,
}

/// Fixed window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    /// Permits consumed in the current window.
    pub count: u64,
    /// When the current window opened, epoch millis.
    pub window_start_ms: u64,
}

/// Sliding window state: a fixed window plus the previous window's total,
/// weighted by overlap at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidingState {
    /// Total permits consumed in the previous window.
    pub previous_count: u64,
    /// Permits consumed in the current window.
    pub count: u64,
    /// When the current window opened, epoch millis.
    pub window_start_ms: u64,
}

/// State blob persisted by the store port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitState {
    Bucket(BucketState),
    Window(WindowState),
    Sliding(SlidingState),
}

impl LimitState {
    pub fn as_bucket(&self) -> Option<BucketState> {
        match self {
            Self::Bucket(state) => Some(*state),
            _ => None,
        }
    }

    pub fn as_window(&self) -> Option<WindowState> {
        match self {
            Self::Window(state) => Some(*state),
            _ => None,
        }
    }

    pub fn as_sliding(&self) -> Option<SlidingState> {
        match self {
            Self::Sliding(state) => Some(*state),
            _ => None,
        }
    }
}
