//! Exponential backoff with optional bounded jitter.

use rand::Rng;
use std::time::Duration;

/// Delay to wait after the `attempt`-th attempt failed (1-based).
///
/// `base * 2^(attempt-1)`: 100ms, 200ms, 400ms... for a 100ms base.
/// Attempt 0 means nothing has failed yet, so no delay.
pub fn calculate_backoff(attempt: u32, base: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.saturating_pow(attempt - 1);
    base.saturating_mul(factor)
}

/// Largest extra delay jitter may add on top of `delay`.
pub fn max_jitter(delay: Duration, jitter_percent: u8) -> Duration {
    delay.saturating_mul(u32::from(jitter_percent)) / 100
}

/// Add uniform jitter in `0..=jitter_percent%` of `delay`. Zero percent is a no-op.
pub fn apply_jitter(delay: Duration, jitter_percent: u8) -> Duration {
    let range = max_jitter(delay, jitter_percent);
    if range.is_zero() {
        return delay;
    }
    let extra = rand::thread_rng().gen_range(Duration::ZERO..=range);
    delay.saturating_add(extra)
}
