//! Rate limiter engine: strategy selection plus atomic store orchestration.
//!
//! The engine owns no per-key state. Every decision is derived fresh from
//! the store's current value, so one instance can be shared as a singleton,
//! cloned per task, or replicated across processes, and concurrent checks
//! for the same key are serialized by the store port, not by any
//! engine-local lock.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::algorithm::AlgorithmKind;
use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use crate::decision::Decision;
use crate::error::{LimitError, StoreError};
use crate::key;
use crate::metrics::{emit_best_effort, DecisionEvent, MetricsSink, NullSink};
use crate::registry::{DefaultKeyRegistry, KeyRegistry};
use crate::state::LimitState;
use crate::store::{AtomicStore, InMemoryStore, Transition};

/// Per-check parameters for [`RateLimiter::decide_with`].
#[derive(Debug, Clone, Copy)]
pub struct CheckRequest {
    /// Algorithm to run; `None` selects the engine default.
    pub algorithm: Option<AlgorithmKind>,
    /// Limit parameters; `None` selects the engine default config.
    pub config: Option<RateLimitConfig>,
    /// Permits to acquire in this check.
    pub permits: u64,
}

impl Default for CheckRequest {
    fn default() -> Self {
        Self { algorithm: None, config: None, permits: 1 }
    }
}

impl CheckRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    pub fn config(mut self, config: RateLimitConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn permits(mut self, permits: u64) -> Self {
        self.permits = permits;
        self
    }
}

/// The decision engine.
///
/// Holds the store port, a clock, a best-effort key registry, and a metrics
/// sink; dispatches checks to the algorithm selected per call.
#[derive(Clone)]
pub struct RateLimiter<S: MetricsSink = NullSink> {
    store: Arc<dyn AtomicStore>,
    clock: Arc<dyn Clock>,
    registry: Arc<dyn KeyRegistry>,
    sink: S,
    default_config: RateLimitConfig,
    default_algorithm: AlgorithmKind,
    store_timeout: Duration,
}

impl<S: MetricsSink> std::fmt::Debug for RateLimiter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("store", &"<store>")
            .field("clock", &self.clock)
            .field("registry", &self.registry)
            .field("default_config", &self.default_config)
            .field("default_algorithm", &self.default_algorithm)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

impl RateLimiter<NullSink> {
    /// Construct a new builder with defaults: in-memory store, system
    /// clock, in-memory registry, null sink.
    pub fn builder() -> RateLimiterBuilder<NullSink> {
        RateLimiterBuilder::new()
    }
}

impl<S> RateLimiter<S>
where
    S: MetricsSink,
    S::Future: Send + 'static,
{
    /// Check one permit against the default algorithm and config.
    pub async fn decide(&self, identifier: &str, resource: &str) -> Result<Decision, LimitError> {
        self.decide_with(identifier, resource, CheckRequest::default()).await
    }

    /// Check with explicit per-call parameters.
    ///
    /// The config is validated before any store round trip. On success the
    /// key is recorded in the registry and a [`DecisionEvent`] is emitted
    /// fire-and-forget; the returned decision is never delayed by the sink.
    pub async fn decide_with(
        &self,
        identifier: &str,
        resource: &str,
        check: CheckRequest,
    ) -> Result<Decision, LimitError> {
        let config = check.config.unwrap_or(self.default_config);
        config.validate()?;
        let store_key = key::encode(identifier, resource)?;

        let algorithm = check.algorithm.unwrap_or(self.default_algorithm);
        let permits = check.permits.max(1);
        let started = Instant::now();
        let now_ms = self.clock.now_millis();
        // TTL bounds memory for idle keys; two windows outlives any state
        // the algorithms still care about.
        let ttl = config.window.saturating_mul(2);

        let transition: Transition =
            Box::new(move |current| algorithm.transition(current, &config, now_ms, permits));
        let applied = match tokio::time::timeout(
            self.store_timeout,
            self.store.apply(&store_key, ttl, transition),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(StoreError::timed_out(self.store_timeout).into()),
        };

        self.registry.insert(store_key);
        let verdict = applied.verdict;
        debug!(
            identifier,
            resource,
            algorithm = ?algorithm,
            allowed = verdict.allowed,
            remaining = verdict.remaining,
            "rate limit decision"
        );

        let event = DecisionEvent {
            identifier: identifier.to_string(),
            resource: resource.to_string(),
            allowed: verdict.allowed,
            decision_latency: started.elapsed(),
        };
        tokio::spawn(emit_best_effort(self.sink.clone(), event));

        Ok(Decision {
            allowed: verdict.allowed,
            remaining: verdict.remaining,
            reset_at_ms: verdict.reset_at_ms,
            identifier: identifier.to_string(),
        })
    }

    /// Delete the key's state unconditionally. Idempotent: resetting an
    /// absent key succeeds.
    pub async fn reset(&self, identifier: &str, resource: &str) -> Result<(), LimitError> {
        let store_key = key::encode(identifier, resource)?;
        match tokio::time::timeout(self.store_timeout, self.store.delete(&store_key)).await {
            Ok(result) => result?,
            Err(_) => return Err(StoreError::timed_out(self.store_timeout).into()),
        }
        self.registry.remove(&store_key);
        debug!(identifier, resource, "rate limit reset");
        Ok(())
    }

    /// Read-only snapshot of the key's stored state.
    ///
    /// Goes through the port's `get`, never the decide path: a status query
    /// must not consume a permit, persist refill progress, or refresh the
    /// TTL.
    pub async fn status(
        &self,
        identifier: &str,
        resource: &str,
    ) -> Result<Option<LimitState>, LimitError> {
        let store_key = key::encode(identifier, resource)?;
        match tokio::time::timeout(self.store_timeout, self.store.get(&store_key)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::timed_out(self.store_timeout).into()),
        }
    }

    /// Sorted snapshot of keys seen by `decide`, for monitoring only.
    /// Best-effort: entries may have already expired in the store.
    pub fn active_keys(&self) -> Vec<String> {
        self.registry.snapshot()
    }
}

/// Builder for [`RateLimiter`].
pub struct RateLimiterBuilder<S: MetricsSink = NullSink> {
    store: Option<Arc<dyn AtomicStore>>,
    clock: Arc<dyn Clock>,
    registry: Arc<dyn KeyRegistry>,
    sink: S,
    default_config: RateLimitConfig,
    default_algorithm: AlgorithmKind,
    store_timeout: Duration,
}

impl RateLimiterBuilder<NullSink> {
    fn new() -> Self {
        Self {
            store: None,
            clock: Arc::new(SystemClock),
            registry: Arc::new(DefaultKeyRegistry::default()),
            sink: NullSink,
            default_config: RateLimitConfig::default(),
            default_algorithm: AlgorithmKind::default(),
            store_timeout: Duration::from_secs(1),
        }
    }
}

impl<S: MetricsSink> RateLimiterBuilder<S> {
    /// Use the given store adapter instead of the in-memory default.
    pub fn store(mut self, store: impl AtomicStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Use an already-shared store adapter.
    pub fn shared_store(mut self, store: Arc<dyn AtomicStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn registry(mut self, registry: impl KeyRegistry + 'static) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Inject the metrics sink decision events flow into.
    pub fn metrics_sink<T: MetricsSink>(self, sink: T) -> RateLimiterBuilder<T> {
        RateLimiterBuilder {
            store: self.store,
            clock: self.clock,
            registry: self.registry,
            sink,
            default_config: self.default_config,
            default_algorithm: self.default_algorithm,
            store_timeout: self.store_timeout,
        }
    }

    /// Config used when a check does not carry its own.
    pub fn default_config(mut self, config: RateLimitConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Algorithm used when a check does not name one.
    pub fn default_algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.default_algorithm = algorithm;
        self
    }

    /// Deadline for a single store call. On elapse the caller gets
    /// `StoreUnavailable`, never a guessed decision.
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<RateLimiter<S>, LimitError> {
        self.default_config.validate()?;
        if self.store_timeout.is_zero() {
            return Err(LimitError::InvalidConfig {
                reason: "store timeout must be positive".into(),
            });
        }
        let store = self.store.unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        Ok(RateLimiter {
            store,
            clock: self.clock,
            registry: self.registry,
            sink: self.sink,
            default_config: self.default_config,
            default_algorithm: self.default_algorithm,
            store_timeout: self.store_timeout,
        })
    }
}
