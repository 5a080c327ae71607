use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use turnstile::{
    AlgorithmKind, Applied, AtomicStore, CheckRequest, InMemoryStore, LimitState, ManualClock,
    MemorySink, RateLimitConfig, RateLimiter, StoreError, Transition,
};

fn limiter_with_clock(
    config: RateLimitConfig,
) -> (RateLimiter, ManualClock) {
    let clock = ManualClock::new(1_000_000);
    let store = InMemoryStore::with_clock(Arc::new(clock.clone()));
    let limiter = RateLimiter::builder()
        .store(store)
        .clock(clock.clone())
        .default_config(config)
        .build()
        .expect("valid limiter");
    (limiter, clock)
}

fn config(capacity: u64, refill_rate: u64, window: Duration) -> RateLimitConfig {
    RateLimitConfig::new(capacity, refill_rate, window).expect("valid config")
}

/// Store whose apply always fails, to exercise the unavailability path.
struct FailingStore;

#[async_trait]
impl AtomicStore for FailingStore {
    async fn apply(
        &self,
        _key: &str,
        _ttl: Duration,
        _transition: Transition,
    ) -> Result<Applied, StoreError> {
        Err(StoreError::new("connection refused"))
    }

    async fn get(&self, _key: &str) -> Result<Option<LimitState>, StoreError> {
        Err(StoreError::new("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::new("connection refused"))
    }
}

/// Store whose calls never complete, to exercise the timeout path.
struct HangingStore;

#[async_trait]
impl AtomicStore for HangingStore {
    async fn apply(
        &self,
        _key: &str,
        _ttl: Duration,
        _transition: Transition,
    ) -> Result<Applied, StoreError> {
        futures::future::pending().await
    }

    async fn get(&self, _key: &str) -> Result<Option<LimitState>, StoreError> {
        futures::future::pending().await
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        futures::future::pending().await
    }
}

#[tokio::test]
async fn token_bucket_burst_drains_then_denies() {
    let (limiter, _clock) = limiter_with_clock(config(5, 5, Duration::from_secs(1)));

    for expected in [4, 3, 2, 1, 0] {
        let decision = limiter.decide("user", "api").await.unwrap();
        assert!(decision.is_allowed());
        assert_eq!(decision.remaining, expected);
    }

    let denied = limiter.decide("user", "api").await.unwrap();
    assert!(!denied.is_allowed());
    assert_eq!(denied.remaining, 0);
    assert!(denied.reset_at_ms > 1_000_000);
    assert_eq!(denied.identifier, "user");
}

#[tokio::test]
async fn token_bucket_refills_after_a_full_window() {
    let (limiter, clock) = limiter_with_clock(config(3, 3, Duration::from_secs(1)));

    for _ in 0..3 {
        assert!(limiter.decide("user", "api").await.unwrap().is_allowed());
    }
    assert!(!limiter.decide("user", "api").await.unwrap().is_allowed());

    clock.advance(Duration::from_secs(1));
    let decision = limiter.decide("user", "api").await.unwrap();
    assert!(decision.is_allowed());
}

#[tokio::test]
async fn token_bucket_partial_refill_unlocks_single_permits() {
    let (limiter, clock) = limiter_with_clock(config(5, 5, Duration::from_secs(1)));

    for _ in 0..5 {
        limiter.decide("user", "api").await.unwrap();
    }

    // 200 ms at 5 permits/s refills exactly one.
    clock.advance(Duration::from_millis(200));
    assert!(limiter.decide("user", "api").await.unwrap().is_allowed());
    assert!(!limiter.decide("user", "api").await.unwrap().is_allowed());
}

#[tokio::test]
async fn fixed_window_resets_at_the_boundary() {
    let (limiter, clock) = limiter_with_clock(config(3, 1, Duration::from_secs(1)));
    let check = CheckRequest::new().algorithm(AlgorithmKind::FixedWindow);

    for expected in [2, 1, 0] {
        let decision = limiter.decide_with("user", "api", check).await.unwrap();
        assert!(decision.is_allowed());
        assert_eq!(decision.remaining, expected);
    }
    let denied = limiter.decide_with("user", "api", check).await.unwrap();
    assert!(!denied.is_allowed());

    clock.advance(Duration::from_secs(1));
    let decision = limiter.decide_with("user", "api", check).await.unwrap();
    assert!(decision.is_allowed());
    assert_eq!(decision.remaining, 2);
}

#[tokio::test]
async fn sliding_window_still_weighs_the_previous_window() {
    let (limiter, clock) = limiter_with_clock(config(4, 1, Duration::from_secs(1)));
    let check = CheckRequest::new().algorithm(AlgorithmKind::SlidingWindow);

    for _ in 0..4 {
        assert!(limiter.decide_with("user", "api", check).await.unwrap().is_allowed());
    }

    // Just past the boundary a fixed window would grant a fresh burst of 4;
    // the sliding window still counts most of the previous one.
    clock.advance(Duration::from_millis(1_100));
    assert!(limiter.decide_with("user", "api", check).await.unwrap().is_allowed());
    assert!(!limiter.decide_with("user", "api", check).await.unwrap().is_allowed());
}

#[tokio::test]
async fn reset_restores_full_capacity() {
    let (limiter, _clock) = limiter_with_clock(config(2, 2, Duration::from_secs(1)));

    limiter.decide("user", "api").await.unwrap();
    limiter.decide("user", "api").await.unwrap();
    assert!(!limiter.decide("user", "api").await.unwrap().is_allowed());

    limiter.reset("user", "api").await.unwrap();
    let decision = limiter.decide("user", "api").await.unwrap();
    assert!(decision.is_allowed());
    assert_eq!(decision.remaining, 1);

    // Resetting a key that no longer exists is still fine.
    limiter.reset("user", "api").await.unwrap();
    limiter.reset("ghost", "api").await.unwrap();
}

#[tokio::test]
async fn status_never_consumes_a_permit() {
    let (limiter, _clock) = limiter_with_clock(config(2, 2, Duration::from_secs(1)));

    limiter.decide("user", "api").await.unwrap();
    for _ in 0..5 {
        let state = limiter.status("user", "api").await.unwrap().expect("state exists");
        assert_eq!(state.as_bucket().unwrap().tokens, 1);
    }

    // The permit count is exactly where decide left it.
    let decision = limiter.decide("user", "api").await.unwrap();
    assert!(decision.is_allowed());
    assert_eq!(decision.remaining, 0);
    assert!(!limiter.decide("user", "api").await.unwrap().is_allowed());
}

#[tokio::test]
async fn status_of_an_unknown_key_is_none() {
    let (limiter, _clock) = limiter_with_clock(config(2, 2, Duration::from_secs(1)));
    assert_eq!(limiter.status("nobody", "api").await.unwrap(), None);
}

#[tokio::test]
async fn backward_clock_fabricates_no_tokens() {
    let (limiter, clock) = limiter_with_clock(config(2, 2, Duration::from_secs(1)));

    limiter.decide("user", "api").await.unwrap();

    // The store's clock appears to move backward by ten seconds.
    clock.set(990_000);
    let decision = limiter.decide("user", "api").await.unwrap();
    assert!(decision.is_allowed());
    assert_eq!(decision.remaining, 0);
    assert!(!limiter.decide("user", "api").await.unwrap().is_allowed());
}

#[tokio::test]
async fn idle_keys_expire_out_of_the_store() {
    let (limiter, clock) = limiter_with_clock(config(5, 5, Duration::from_secs(1)));

    limiter.decide("user", "api").await.unwrap();
    assert!(limiter.status("user", "api").await.unwrap().is_some());

    // TTL is two windows.
    clock.advance(Duration::from_millis(2_001));
    assert_eq!(limiter.status("user", "api").await.unwrap(), None);
}

#[tokio::test]
async fn invalid_config_is_rejected_before_the_store_is_touched() {
    // A store that always fails: if the store were consulted first, the
    // error kind would be StoreUnavailable instead of InvalidConfig.
    let limiter = RateLimiter::builder().store(FailingStore).build().unwrap();

    let bad = RateLimitConfig { capacity: 0, refill_rate: 1, window: Duration::from_secs(1) };
    let err = limiter
        .decide_with("user", "api", CheckRequest::new().config(bad))
        .await
        .unwrap_err();
    assert!(err.is_config());
}

#[tokio::test]
async fn unencodable_keys_are_rejected() {
    let (limiter, _clock) = limiter_with_clock(config(5, 5, Duration::from_secs(1)));

    let err = limiter.decide("user:42", "api").await.unwrap_err();
    assert!(err.is_key_encoding());

    let err = limiter.decide("user", "").await.unwrap_err();
    assert!(err.is_key_encoding());
}

#[tokio::test]
async fn store_failure_surfaces_as_unavailable() {
    let limiter = RateLimiter::builder().store(FailingStore).build().unwrap();

    let err = limiter.decide("user", "api").await.unwrap_err();
    assert!(err.is_store_unavailable());

    let err = limiter.status("user", "api").await.unwrap_err();
    assert!(err.is_store_unavailable());
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out_as_unavailable() {
    let limiter = RateLimiter::builder()
        .store(HangingStore)
        .store_timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let err = limiter.decide("user", "api").await.unwrap_err();
    assert!(err.is_store_unavailable());
    assert!(err.to_string().contains("100"));
}

#[tokio::test]
async fn every_decision_emits_one_metrics_event() {
    let sink = MemorySink::new();
    let clock = ManualClock::new(0);
    let limiter = RateLimiter::builder()
        .store(InMemoryStore::with_clock(Arc::new(clock.clone())))
        .clock(clock)
        .default_config(config(1, 1, Duration::from_secs(1)))
        .metrics_sink(sink.clone())
        .build()
        .unwrap();

    let allowed = limiter.decide("user", "api").await.unwrap();
    assert!(allowed.is_allowed());
    let denied = limiter.decide("user", "api").await.unwrap();
    assert!(!denied.is_allowed());

    // Emission is fire-and-forget; give the spawned tasks a chance to run.
    tokio::time::timeout(Duration::from_secs(1), async {
        while sink.len() < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("events should arrive");

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.identifier == "user" && e.resource == "api"));
    assert_eq!(events.iter().filter(|e| e.allowed).count(), 1);
}

#[tokio::test]
async fn active_keys_track_decides_and_resets() {
    let (limiter, _clock) = limiter_with_clock(config(5, 5, Duration::from_secs(1)));

    limiter.decide("bob", "api").await.unwrap();
    limiter.decide("alice", "api").await.unwrap();
    // Denied decisions are recorded too.
    for _ in 0..6 {
        limiter.decide("carol", "api").await.unwrap();
    }

    assert_eq!(
        limiter.active_keys(),
        vec!["rateLimit:alice:api", "rateLimit:bob:api", "rateLimit:carol:api"]
    );

    limiter.reset("bob", "api").await.unwrap();
    assert_eq!(limiter.active_keys(), vec!["rateLimit:alice:api", "rateLimit:carol:api"]);
}

#[tokio::test]
async fn engine_default_algorithm_is_honored() {
    let clock = ManualClock::new(0);
    let limiter = RateLimiter::builder()
        .store(InMemoryStore::with_clock(Arc::new(clock.clone())))
        .clock(clock)
        .default_config(config(3, 1, Duration::from_secs(1)))
        .default_algorithm(AlgorithmKind::FixedWindow)
        .build()
        .unwrap();

    limiter.decide("user", "api").await.unwrap();
    let state = limiter.status("user", "api").await.unwrap().expect("state exists");
    assert!(matches!(state, LimitState::Window(_)));
}

#[tokio::test]
async fn per_call_config_overrides_the_default() {
    let (limiter, _clock) = limiter_with_clock(config(100, 10, Duration::from_secs(1)));

    let tight = config(1, 1, Duration::from_secs(60));
    let check = CheckRequest::new().config(tight);
    assert!(limiter.decide_with("user", "api", check).await.unwrap().is_allowed());
    assert!(!limiter.decide_with("user", "api", check).await.unwrap().is_allowed());
}
