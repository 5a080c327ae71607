//! Tower middleware that enforces rate limits in front of a service.
//!
//! The layer consults a [`RateLimiter`] before forwarding each request. It
//! does not know how limiting works; a caller-supplied extractor maps the
//! request to the identifier/resource pair being limited.

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

use crate::decision::Decision;
use crate::engine::{CheckRequest, RateLimiter};
use crate::error::LimitError;
use crate::metrics::MetricsSink;

/// Maps a request to the (identifier, resource) pair it is limited under.
pub type KeyExtractor<Req> = Arc<dyn Fn(&Req) -> (String, String) + Send + Sync>;

/// Error produced by [`RateLimitService`].
#[derive(Debug)]
pub enum GateError<E> {
    /// The request was denied by the rate limiter. Carries the full
    /// decision so callers can populate retry headers.
    Limited { decision: Decision },
    /// The limiter could not decide (config, key, or store problem). The
    /// caller picks fail-open or fail-closed by matching this variant.
    Store(LimitError),
    /// The inner service failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for GateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited { decision } => write!(
                f,
                "rate limited: {} has {} remaining until {}",
                decision.identifier, decision.remaining, decision.reset_at_ms
            ),
            Self::Store(err) => write!(f, "{}", err),
            Self::Inner(err) => write!(f, "{}", err),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for GateError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Limited { .. } => None,
            Self::Store(err) => Some(err),
            Self::Inner(err) => Some(err),
        }
    }
}

impl<E> GateError<E> {
    /// Check if this error is a rate limit denial.
    pub fn is_limited(&self) -> bool {
        matches!(self, Self::Limited { .. })
    }

    /// Check if this error came from the limiter infrastructure.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// The denying decision, if this is a `Limited` error.
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Self::Limited { decision } => Some(decision),
            _ => None,
        }
    }

    /// Get the inner service error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(err) => Some(err),
            _ => None,
        }
    }
}

/// A layer that enforces rate limits using a [`RateLimiter`].
pub struct RateLimitLayer<M: MetricsSink, Req> {
    limiter: Arc<RateLimiter<M>>,
    key_fn: KeyExtractor<Req>,
    check: CheckRequest,
}

impl<M: MetricsSink, Req> RateLimitLayer<M, Req> {
    /// Create a new rate limit layer around `limiter`, keying requests with
    /// `key_fn`.
    pub fn new(
        limiter: RateLimiter<M>,
        key_fn: impl Fn(&Req) -> (String, String) + Send + Sync + 'static,
    ) -> Self {
        Self { limiter: Arc::new(limiter), key_fn: Arc::new(key_fn), check: CheckRequest::new() }
    }

    /// Use explicit per-check parameters instead of the engine defaults.
    pub fn with_check(mut self, check: CheckRequest) -> Self {
        self.check = check;
        self
    }
}

impl<M: MetricsSink, Req> Clone for RateLimitLayer<M, Req> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone(), key_fn: self.key_fn.clone(), check: self.check }
    }
}

impl<S, M: MetricsSink, Req> Layer<S> for RateLimitLayer<M, Req> {
    type Service = RateLimitService<S, M, Req>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService {
            inner: service,
            limiter: self.limiter.clone(),
            key_fn: self.key_fn.clone(),
            check: self.check,
        }
    }
}

/// Middleware service that enforces rate limits.
pub struct RateLimitService<S, M: MetricsSink, Req> {
    inner: S,
    limiter: Arc<RateLimiter<M>>,
    key_fn: KeyExtractor<Req>,
    check: CheckRequest,
}

impl<S: Clone, M: MetricsSink, Req> Clone for RateLimitService<S, M, Req> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            key_fn: self.key_fn.clone(),
            check: self.check,
        }
    }
}

impl<S, M, Req> Service<Req> for RateLimitService<S, M, Req>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    M: MetricsSink + Sync,
    M::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = GateError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(GateError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let (identifier, resource) = (self.key_fn)(&req);
        let limiter = self.limiter.clone();
        let check = self.check;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match limiter.decide_with(&identifier, &resource, check).await {
                Ok(decision) if decision.allowed => {
                    inner.call(req).await.map_err(GateError::Inner)
                }
                Ok(decision) => Err(GateError::Limited { decision }),
                Err(err) => Err(GateError::Store(err)),
            }
        })
    }
}
