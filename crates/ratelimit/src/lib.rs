//! Quota enforcement for outbound messages, API calls and media uploads.
//!
//! All counters live in a [`CounterStore`](chatshop_state::CounterStore) as
//! fixed windows: one key per `(scope, bucket)` whose TTL is the window
//! length, set at the first increment. Blocks, failure lists and last-send
//! timestamps share the same store.

pub mod backoff;
pub mod block;
pub mod bucket;
pub mod config;
pub mod error;
pub mod limiter;
pub mod report;

pub use block::{BlockRecord, FailureRecord};
pub use bucket::Bucket;
pub use config::RateLimitConfig;
pub use error::RateLimitError;
pub use limiter::{RateLimiter, SendDecision};
pub use report::{
    ApiQuota, ContactQuota, GlobalQuota, HealthReport, HealthStatus, MediaQuota, QuotaUsage,
    RateLimitStatistics,
};
