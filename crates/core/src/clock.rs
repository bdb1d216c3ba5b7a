use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

/// Wall-clock reader anchored to tokio's monotonic clock.
///
/// `now()` is the wall time captured at construction plus the monotonic time
/// elapsed since then. Under a paused tokio runtime the clock moves only with
/// `tokio::time::advance`, which keeps TTL expiry in the state store and
/// timestamp arithmetic in the rate limiter on the same timeline.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    wall_origin: DateTime<Utc>,
    origin: Instant,
}

impl Clock {
    /// Create a clock anchored at the current wall time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wall_origin: Utc::now(),
            origin: Instant::now(),
        }
    }

    /// Current wall time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed =
            TimeDelta::from_std(self.origin.elapsed()).unwrap_or_else(|_| TimeDelta::zero());
        self.wall_origin + elapsed
    }

    /// Current time as Unix milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn clock_follows_paused_time() {
        let clock = Clock::new();
        let before = clock.now();
        tokio::time::advance(Duration::from_secs(90)).await;
        let after = clock.now();
        assert_eq!((after - before).num_seconds(), 90);
    }
}
