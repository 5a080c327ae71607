//! Sliding window: a fixed window smoothed by carrying the previous
//! window's count, weighted by how much of it still overlaps the sliding
//! interval.
//!
//! This keeps the state at two counters and a timestamp, so one store round
//! trip still suffices, while removing the fixed window's burst-at-the-
//! boundary artifact.

use crate::algorithm::Verdict;
use crate::config::RateLimitConfig;
use crate::state::SlidingState;

/// Pure sliding window transition.
pub fn transition(
    current: Option<SlidingState>,
    config: &RateLimitConfig,
    now_ms: u64,
    permits: u64,
) -> (SlidingState, Verdict) {
    let window_ms = config.window_millis();
    let state = match current {
        Some(state) => roll_forward(state, now_ms, window_ms),
        None => SlidingState { previous_count: 0, count: 0, window_start_ms: now_ms },
    };

    // roll_forward guarantees elapsed < window here.
    let elapsed = now_ms.saturating_sub(state.window_start_ms);
    let overlap_ms = window_ms - elapsed.min(window_ms);
    let carried =
        u128::from(state.previous_count) * u128::from(overlap_ms) / u128::from(window_ms);
    let effective = u128::from(state.count) + carried;
    let reset_at_ms = state.window_start_ms.saturating_add(window_ms);

    if effective + u128::from(permits) <= u128::from(config.capacity) {
        let next = SlidingState {
            previous_count: state.previous_count,
            count: state.count + permits,
            window_start_ms: state.window_start_ms,
        };
        let remaining = u128::from(config.capacity) - effective - u128::from(permits);
        let verdict = Verdict {
            allowed: true,
            remaining: u64::try_from(remaining).unwrap_or(u64::MAX),
            reset_at_ms,
        };
        (next, verdict)
    } else {
        let remaining = u128::from(config.capacity).saturating_sub(effective);
        let verdict = Verdict {
            allowed: false,
            remaining: u64::try_from(remaining).unwrap_or(u64::MAX),
            reset_at_ms,
        };
        (state, verdict)
    }
}

/// Advance the window so `now_ms` falls inside it. Crossing one boundary
/// promotes the current count to `previous_count`; crossing more than one
/// means a full idle window passed and nothing carries over.
fn roll_forward(state: SlidingState, now_ms: u64, window_ms: u64) -> SlidingState {
    let elapsed = now_ms.saturating_sub(state.window_start_ms);
    if elapsed < window_ms {
        return state;
    }
    let windows_crossed = elapsed / window_ms;
    let window_start_ms =
        state.window_start_ms.saturating_add(windows_crossed.saturating_mul(window_ms));
    let previous_count = if windows_crossed == 1 { state.count } else { 0 };
    SlidingState { previous_count, count: 0, window_start_ms }
}
