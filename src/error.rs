//! Error types for rate limiting operations.
//!
//! A denied decision is not an error; it is a normal
//! [`Decision`](crate::Decision) with `allowed == false`. Only validation
//! and infrastructure problems surface here, as distinct, inspectable
//! kinds. Nothing is logged-and-swallowed inside the engine.

use thiserror::Error;

/// Error from an [`AtomicStore`](crate::store::AtomicStore) adapter.
///
/// Produced when the backend is unreachable or the atomicity guarantee
/// could not be honored. It never carries a partially-applied state or a
/// guessed decision.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct StoreError {
    reason: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into(), source: None }
    }

    pub fn with_source(
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self { reason: reason.into(), source: Some(Box::new(source)) }
    }

    /// Timeout constructor used by the engine when a store call exceeds its
    /// deadline.
    pub fn timed_out(limit: std::time::Duration) -> Self {
        Self::new(format!("store call exceeded {:?}", limit))
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Unified error type for engine operations.
#[derive(Debug, Error)]
pub enum LimitError {
    /// The supplied configuration violates its invariants. Rejected before
    /// any store round trip.
    #[error("invalid rate limit config: {reason}")]
    InvalidConfig {
        /// Which invariant failed.
        reason: String,
    },

    /// The store was unreachable or could not complete the atomic apply.
    /// Callers choose fail-open or fail-closed; the engine only reports.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The identifier/resource pair cannot be safely encoded as a store key.
    #[error("cannot encode store key: {reason}")]
    KeyEncoding {
        /// What made the segments unencodable.
        reason: String,
    },
}

impl LimitError {
    /// Check if this error is a configuration problem.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Check if this error is a store availability problem.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Check if this error is a key encoding problem.
    pub fn is_key_encoding(&self) -> bool {
        matches!(self, Self::KeyEncoding { .. })
    }
}
