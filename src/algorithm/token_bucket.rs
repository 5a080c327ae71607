//! Token bucket: a capacity-bounded reservoir refilled at a fixed rate.

use crate::algorithm::Verdict;
use crate::config::RateLimitConfig;
use crate::state::BucketState;

/// Pure token bucket transition.
///
/// Absent state means first access: the bucket starts full. Refill is
/// integer floor arithmetic over the elapsed time, clamped at zero so a
/// backward clock jump never fabricates tokens. The refill is persisted
/// even when the request is denied.
pub fn transition(
    current: Option<BucketState>,
    config: &RateLimitConfig,
    now_ms: u64,
    permits: u64,
) -> (BucketState, Verdict) {
    let window_ms = config.window_millis();
    let (tokens, last_refill_ms) = match current {
        Some(state) => (state.tokens, state.last_refill_ms),
        None => (config.capacity, now_ms),
    };

    let elapsed = now_ms.saturating_sub(last_refill_ms);
    let refilled = u128::from(elapsed) * u128::from(config.refill_rate) / u128::from(window_ms);
    let refilled = u64::try_from(refilled).unwrap_or(u64::MAX);
    let available = tokens.saturating_add(refilled).min(config.capacity);

    if available >= permits {
        let remaining = available - permits;
        let state = BucketState { tokens: remaining, last_refill_ms: now_ms };
        // Conservative estimate: a full window guarantees full replenishment.
        let verdict =
            Verdict { allowed: true, remaining, reset_at_ms: now_ms.saturating_add(window_ms) };
        (state, verdict)
    } else {
        let state = BucketState { tokens: available, last_refill_ms: now_ms };
        let shortfall = permits - available;
        let wait_ms = (u128::from(shortfall) * u128::from(window_ms))
            .div_ceil(u128::from(config.refill_rate));
        let wait_ms = u64::try_from(wait_ms).unwrap_or(u64::MAX);
        let verdict = Verdict {
            allowed: false,
            remaining: available,
            reset_at_ms: now_ms.saturating_add(wait_ms),
        };
        (state, verdict)
    }
}
