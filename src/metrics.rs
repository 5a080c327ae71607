//! Decision events for observability.
//!
//! The engine emits one [`DecisionEvent`] per decision. Events flow through
//! [`MetricsSink`] implementations, modeled as `tower::Service<DecisionEvent>`
//! so sinks compose with standard tower combinators. Emission is
//! fire-and-forget: a slow or failing sink never delays the decision handed
//! back to the caller.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// One rate limit decision, as seen by observability consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub identifier: String,
    pub resource: String,
    pub allowed: bool,
    /// Time from entering `decide` to having the decision in hand.
    pub decision_latency: Duration,
}

impl fmt::Display for DecisionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "decision(identifier={}, resource={}, allowed={}, latency={:?})",
            self.identifier, self.resource, self.allowed, self.decision_latency
        )
    }
}

/// A sink that consumes decision events.
///
/// Implemented as a `tower::Service<DecisionEvent>` for composability.
pub trait MetricsSink:
    Service<DecisionEvent, Response = (), Error = Self::SinkError> + Clone + Send + 'static
{
    /// The error type for this sink.
    type SinkError: std::error::Error + Send + 'static;
}

/// Best-effort emit helper that honors `poll_ready` and swallows errors.
///
/// If the sink is not ready or returns an error, the event is dropped; the
/// decision path never observes sink failures.
pub async fn emit_best_effort<S>(sink: S, event: DecisionEvent)
where
    S: Service<DecisionEvent, Response = ()> + Send + Clone + 'static,
    S::Error: std::error::Error + Send + 'static,
    S::Future: Send + 'static,
{
    use tower::ServiceExt;

    if let Ok(mut ready_sink) = sink.ready_oneshot().await {
        let _ = ready_sink.call(event).await;
    }
}

/// A no-op sink that discards all events.
///
/// The default when no sink is injected.
#[derive(Clone, Debug, Default)]
pub struct NullSink;

impl Service<DecisionEvent> for NullSink {
    type Response = ();
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _event: DecisionEvent) -> Self::Future {
        Box::pin(async { Ok(()) })
    }
}

impl MetricsSink for NullSink {
    type SinkError = Infallible;
}

/// A sink that logs events through the `tracing` crate at DEBUG level.
#[derive(Clone, Debug, Default)]
pub struct LogSink;

impl Service<DecisionEvent> for LogSink {
    type Response = ();
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: DecisionEvent) -> Self::Future {
        tracing::debug!(event = %event, "rate_limit_decision");
        Box::pin(async { Ok(()) })
    }
}

impl MetricsSink for LogSink {
    type SinkError = Infallible;
}

/// A bounded sink that stores events in memory, evicting the oldest when
/// full. Useful for tests and debugging.
#[derive(Clone, Debug)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<DecisionEvent>>>,
    capacity: usize,
    evicted: Arc<AtomicU64>,
}

impl MemorySink {
    /// Creates a bounded memory sink (default cap: 10,000).
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    /// Creates a bounded memory sink with explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Snapshot of all stored events.
    pub fn events(&self) -> Vec<DecisionEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Clears all stored events.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }

    /// Number of events evicted because the sink was full.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<DecisionEvent> for MemorySink {
    type Response = ();
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: DecisionEvent) -> Self::Future {
        let mut events = self.events.lock().unwrap();
        if events.len() >= self.capacity {
            events.remove(0);
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        events.push(event);
        Box::pin(async { Ok(()) })
    }
}

impl MetricsSink for MemorySink {
    type SinkError = Infallible;
}
