#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Turnstile
//!
//! Distributed rate limiting primitives for async Rust: pluggable
//! algorithms, an atomic store port for shared backends, and a stateless
//! decision engine.
//!
//! ## Features
//!
//! - **Token bucket, fixed window, and sliding window** algorithms as pure
//!   transition functions, selected per check by a tag
//! - **Atomic store port** ([`AtomicStore`]): per-key linearizable
//!   read-modify-write with expiry, so concurrent checks against shared
//!   state are race-free without engine-local locks
//! - **Stateless engine** that is safe to clone per task or share across
//!   processes; multiple instances are serialized by the store, not by a
//!   mutex
//! - **Decision events** through composable `tower`-based metrics sinks
//! - **Tower middleware** for enforcing limits in front of any service
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use turnstile::{RateLimitConfig, RateLimiter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), turnstile::LimitError> {
//!     let limiter = RateLimiter::builder()
//!         .default_config(RateLimitConfig::new(10, 10, Duration::from_secs(1))?)
//!         .build()?;
//!
//!     let decision = limiter.decide("user-42", "api").await?;
//!     assert!(decision.is_allowed());
//!     assert_eq!(decision.remaining, 9);
//!     Ok(())
//! }
//! ```

pub mod algorithm;
pub mod clock;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod key;
pub mod metrics;
pub mod middleware;
pub mod registry;
pub mod state;
pub mod store;

// Re-exports
pub use algorithm::{AlgorithmKind, Verdict};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RateLimitConfig;
pub use decision::Decision;
pub use engine::{CheckRequest, RateLimiter, RateLimiterBuilder};
pub use error::{LimitError, StoreError};
pub use metrics::{DecisionEvent, LogSink, MemorySink, MetricsSink, NullSink};
pub use middleware::{GateError, RateLimitLayer, RateLimitService};
pub use registry::{DefaultKeyRegistry, InMemoryKeyRegistry, KeyRegistry};
pub use state::{BucketState, LimitState, SlidingState, WindowState};
pub use store::{Applied, AtomicStore, InMemoryStore, Transition};
