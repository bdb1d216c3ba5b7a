//! Exponential backoff with bounded random jitter.

use std::time::Duration;

use rand::Rng;

/// Deterministic part of the backoff: `min(base * 2^attempt, cap)`.
///
/// Attempt `k` doubles the delay of attempt `k - 1`; with the default base of
/// one second and cap of 300 seconds the cap is reached at attempt 9.
pub fn base_delay(base_seconds: u64, cap_seconds: u64, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let secs = base_seconds.saturating_mul(factor).min(cap_seconds);
    Duration::from_secs(secs)
}

/// Add uniform jitter in `[0, delay * ratio]`, at millisecond resolution.
pub fn with_jitter<R: Rng + ?Sized>(delay: Duration, ratio: f64, rng: &mut R) -> Duration {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let max_jitter_ms = (delay.as_millis() as f64 * ratio.clamp(0.0, 1.0)).floor() as u64;
    if max_jitter_ms == 0 {
        return delay;
    }
    delay + Duration::from_millis(rng.gen_range(0..=max_jitter_ms))
}
