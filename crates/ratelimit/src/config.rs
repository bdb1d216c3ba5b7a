use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ceilings and tunables for the rate limiter.
///
/// Deserializes from the `[rate_limit]` configuration section; every field
/// is optional and falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Key namespace for every counter the limiter writes.
    pub namespace: String,

    pub contact_per_hour: u64,
    pub contact_per_day: u64,
    pub global_per_minute: u64,
    pub global_per_hour: u64,
    pub api_per_minute: u64,
    pub api_per_hour: u64,
    pub media_per_hour: u64,
    pub media_per_day: u64,

    /// Default minimum gap between two sends to the same contact.
    pub cooldown_seconds: u64,

    pub backoff_base_seconds: u64,
    pub backoff_max_seconds: u64,
    /// Upper bound of the random jitter, as a fraction of the computed delay.
    pub backoff_jitter_ratio: f64,

    /// Failures within `auto_block_window_seconds` that trigger an auto-block.
    pub auto_block_threshold: usize,
    pub auto_block_window_seconds: u64,
    pub auto_block_duration_seconds: u64,

    /// Most recent failures kept per contact.
    pub failure_list_cap: usize,
    pub failure_retention_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            namespace: "chatshop".to_owned(),
            contact_per_hour: 10,
            contact_per_day: 100,
            global_per_minute: 80,
            global_per_hour: 1000,
            api_per_minute: 240,
            api_per_hour: 10_000,
            media_per_hour: 100,
            media_per_day: 1000,
            cooldown_seconds: 60,
            backoff_base_seconds: 1,
            backoff_max_seconds: 300,
            backoff_jitter_ratio: 0.10,
            auto_block_threshold: 5,
            auto_block_window_seconds: 3600,
            auto_block_duration_seconds: 3600,
            failure_list_cap: 10,
            failure_retention_seconds: 86_400,
        }
    }
}

impl RateLimitConfig {
    pub fn auto_block_window(&self) -> Duration {
        Duration::from_secs(self.auto_block_window_seconds)
    }

    pub fn auto_block_duration(&self) -> Duration {
        Duration::from_secs(self.auto_block_duration_seconds)
    }

    pub fn failure_retention(&self) -> Duration {
        Duration::from_secs(self.failure_retention_seconds)
    }

    /// Check the values for internal consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.namespace.is_empty() {
            return Err("rate_limit.namespace must not be empty".into());
        }
        if self.backoff_base_seconds == 0 {
            return Err("rate_limit.backoff_base_seconds must be at least 1".into());
        }
        if self.backoff_max_seconds < self.backoff_base_seconds {
            return Err("rate_limit.backoff_max_seconds must be >= backoff_base_seconds".into());
        }
        if !(0.0..=1.0).contains(&self.backoff_jitter_ratio) {
            return Err("rate_limit.backoff_jitter_ratio must be within 0.0..=1.0".into());
        }
        if self.failure_list_cap < self.auto_block_threshold {
            return Err(
                "rate_limit.failure_list_cap must be >= auto_block_threshold, \
                 otherwise auto-block can never trigger"
                    .into(),
            );
        }
        Ok(())
    }
}
