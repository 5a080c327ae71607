//! Fixed window: counting within discrete, non-overlapping time windows.

use crate::algorithm::Verdict;
use crate::config::RateLimitConfig;
use crate::state::WindowState;

/// Pure fixed window transition.
///
/// The window boundary is exclusive on the start side: `elapsed >= window`
/// opens a new window, so a check landing exactly on the boundary resets
/// once, not twice. A denial leaves the counter unchanged.
pub fn transition(
    current: Option<WindowState>,
    config: &RateLimitConfig,
    now_ms: u64,
    permits: u64,
) -> (WindowState, Verdict) {
    let window_ms = config.window_millis();
    let state = match current {
        Some(state) if now_ms.saturating_sub(state.window_start_ms) < window_ms => state,
        _ => WindowState { count: 0, window_start_ms: now_ms },
    };
    let reset_at_ms = state.window_start_ms.saturating_add(window_ms);

    if state.count.saturating_add(permits) <= config.capacity {
        let count = state.count + permits;
        let verdict =
            Verdict { allowed: true, remaining: config.capacity - count, reset_at_ms };
        (WindowState { count, window_start_ms: state.window_start_ms }, verdict)
    } else {
        let verdict = Verdict {
            allowed: false,
            remaining: config.capacity.saturating_sub(state.count),
            reset_at_ms,
        };
        (state, verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(capacity: u64, window: Duration) -> RateLimitConfig {
        RateLimitConfig::new(capacity, 1, window).unwrap()
    }

    #[test]
    fn limit_requests_fit_and_the_next_is_denied() {
        let cfg = config(3, Duration::from_secs(1));
        let mut current = None;
        for expected in [2, 1, 0] {
            let (state, verdict) = transition(current, &cfg, 100, 1);
            assert!(verdict.allowed);
            assert_eq!(verdict.remaining, expected);
            current = Some(state);
        }

        let (state, verdict) = transition(current, &cfg, 900, 1);
        assert!(!verdict.allowed);
        assert_eq!(verdict.remaining, 0);
        // Counter untouched by the denial.
        assert_eq!(state.count, 3);
    }

    #[test]
    fn boundary_is_exclusive_on_the_start_side() {
        let cfg = config(2, Duration::from_secs(1));
        let full = WindowState { count: 2, window_start_ms: 1_000 };

        // One millisecond before the boundary: still the old window.
        let (_, verdict) = transition(Some(full), &cfg, 1_999, 1);
        assert!(!verdict.allowed);

        // Exactly at the boundary: new window opens.
        let (state, verdict) = transition(Some(full), &cfg, 2_000, 1);
        assert!(verdict.allowed);
        assert_eq!(state, WindowState { count: 1, window_start_ms: 2_000 });
    }

    #[test]
    fn reset_at_points_to_the_window_end() {
        let cfg = config(5, Duration::from_secs(60));
        let (state, verdict) = transition(None, &cfg, 10_000, 1);
        assert_eq!(verdict.reset_at_ms, 70_000);

        // Later checks in the same window keep the same reset point.
        let (_, verdict) = transition(Some(state), &cfg, 35_000, 1);
        assert_eq!(verdict.reset_at_ms, 70_000);
    }

    #[test]
    fn oversized_request_is_denied_without_counting() {
        let cfg = config(3, Duration::from_secs(1));
        let (state, verdict) = transition(None, &cfg, 0, 4);
        assert!(!verdict.allowed);
        assert_eq!(state.count, 0);
        assert_eq!(verdict.remaining, 3);
    }

    #[test]
    fn backward_clock_stays_in_the_current_window() {
        let cfg = config(3, Duration::from_secs(1));
        let state = WindowState { count: 2, window_start_ms: 5_000 };

        // now < window_start: clamped elapsed keeps the window open rather
        // than resetting the counter.
        let (state, verdict) = transition(Some(state), &cfg, 4_500, 1);
        assert!(verdict.allowed);
        assert_eq!(state.count, 3);
        assert_eq!(state.window_start_ms, 5_000);
    }
}
