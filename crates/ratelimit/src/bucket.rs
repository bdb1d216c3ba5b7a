use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RateLimitConfig;

/// A fixed-window usage counter tracked by the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    ContactHour,
    ContactDay,
    GlobalMinute,
    GlobalHour,
    ApiMinute,
    ApiHour,
    MediaHour,
    MediaDay,
}

impl Bucket {
    /// Buckets consulted for a message send, contact buckets first.
    pub const SEND: [Bucket; 4] = [
        Bucket::ContactHour,
        Bucket::ContactDay,
        Bucket::GlobalMinute,
        Bucket::GlobalHour,
    ];
    pub const API: [Bucket; 2] = [Bucket::ApiMinute, Bucket::ApiHour];
    pub const MEDIA: [Bucket; 2] = [Bucket::MediaHour, Bucket::MediaDay];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContactHour => "contact_hour",
            Self::ContactDay => "contact_day",
            Self::GlobalMinute => "global_minute",
            Self::GlobalHour => "global_hour",
            Self::ApiMinute => "api_minute",
            Self::ApiHour => "api_hour",
            Self::MediaHour => "media_hour",
            Self::MediaDay => "media_day",
        }
    }

    /// Window length; also the TTL of the bucket's counter.
    pub fn window(self) -> Duration {
        match self {
            Self::GlobalMinute | Self::ApiMinute => Duration::from_secs(60),
            Self::ContactHour | Self::GlobalHour | Self::ApiHour | Self::MediaHour => {
                Duration::from_secs(3600)
            }
            Self::ContactDay | Self::MediaDay => Duration::from_secs(86_400),
        }
    }

    /// Configured ceiling for this bucket.
    pub fn limit(self, config: &RateLimitConfig) -> u64 {
        match self {
            Self::ContactHour => config.contact_per_hour,
            Self::ContactDay => config.contact_per_day,
            Self::GlobalMinute => config.global_per_minute,
            Self::GlobalHour => config.global_per_hour,
            Self::ApiMinute => config.api_per_minute,
            Self::ApiHour => config.api_per_hour,
            Self::MediaHour => config.media_per_hour,
            Self::MediaDay => config.media_per_day,
        }
    }

    /// Whether the counter is scoped to a single contact.
    pub fn is_per_contact(self) -> bool {
        matches!(self, Self::ContactHour | Self::ContactDay)
    }

    /// Store key id, e.g. `contact:+234800:hour` or `global:minute`.
    pub fn key_id(self, contact: &str) -> String {
        match self {
            Self::ContactHour => format!("contact:{contact}:hour"),
            Self::ContactDay => format!("contact:{contact}:day"),
            Self::GlobalMinute => "global:minute".to_owned(),
            Self::GlobalHour => "global:hour".to_owned(),
            Self::ApiMinute => "api:minute".to_owned(),
            Self::ApiHour => "api:hour".to_owned(),
            Self::MediaHour => "media:hour".to_owned(),
            Self::MediaDay => "media:day".to_owned(),
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
