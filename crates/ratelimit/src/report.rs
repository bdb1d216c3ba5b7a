use serde::{Deserialize, Serialize};

/// Usage of a single bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    /// Seconds until the current window resets, zero when no window is open.
    pub resets_in: u64,
}

impl QuotaUsage {
    pub fn new(used: u64, limit: u64, resets_in: u64) -> Self {
        Self {
            used,
            limit,
            remaining: limit.saturating_sub(used),
            resets_in,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Remaining quota is within 10% of the ceiling.
    pub fn is_near_limit(&self) -> bool {
        self.remaining.saturating_mul(10) <= self.limit
    }

    /// Used share of the ceiling in percent.
    #[allow(clippy::cast_precision_loss)]
    pub fn utilization(&self) -> f64 {
        if self.limit == 0 {
            return 100.0;
        }
        self.used as f64 * 100.0 / self.limit as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactQuota {
    pub contact: String,
    pub hour: QuotaUsage,
    pub day: QuotaUsage,
    pub blocked: bool,
    pub cooldown_remaining: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalQuota {
    pub minute: QuotaUsage,
    pub hour: QuotaUsage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiQuota {
    pub minute: QuotaUsage,
    pub hour: QuotaUsage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaQuota {
    pub hour: QuotaUsage,
    pub day: QuotaUsage,
}

/// Point-in-time usage across every shared bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatistics {
    pub global: GlobalQuota,
    pub api: ApiQuota,
    pub media: MediaQuota,
}

impl RateLimitStatistics {
    /// Every bucket with its name, for iteration in reports.
    pub fn buckets(&self) -> [(&'static str, QuotaUsage); 6] {
        [
            ("global_minute", self.global.minute),
            ("global_hour", self.global.hour),
            ("api_minute", self.api.minute),
            ("api_hour", self.api.hour),
            ("media_hour", self.media.hour),
            ("media_day", self.media.day),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub issues: Vec<String>,
    pub statistics: RateLimitStatistics,
}

impl HealthReport {
    /// Derive status and issues from a statistics snapshot.
    ///
    /// `warning` when any bucket is within 10% of its ceiling, `critical`
    /// when the per-minute API quota is exhausted.
    pub fn from_statistics(statistics: RateLimitStatistics) -> Self {
        let mut status = HealthStatus::Healthy;
        let mut issues = Vec::new();

        for (name, usage) in statistics.buckets() {
            if usage.is_near_limit() {
                status = status.max(HealthStatus::Warning);
                issues.push(format!(
                    "{name} quota nearly exhausted: {} of {} remaining",
                    usage.remaining, usage.limit
                ));
            }
        }
        if statistics.api.minute.is_exhausted() {
            status = HealthStatus::Critical;
            issues.push("api_minute quota exhausted, API calls are being rejected".to_owned());
        }

        Self {
            status,
            issues,
            statistics,
        }
    }
}

/// Advice derived from current usage.
pub fn optimization_suggestions(statistics: &RateLimitStatistics) -> Vec<String> {
    let mut out = Vec::new();
    if statistics.global.minute.utilization() >= 80.0 {
        out.push(
            "Message throughput is close to the per-minute ceiling; spread campaign sends \
             over a longer period."
                .to_owned(),
        );
    }
    if statistics.global.hour.utilization() >= 80.0 {
        out.push(
            "Hourly message volume is high; schedule non-urgent campaigns for off-peak hours."
                .to_owned(),
        );
    }
    if statistics.api.minute.utilization() >= 80.0 || statistics.api.hour.utilization() >= 80.0 {
        out.push("API usage is high; cache contact lookups and batch API requests.".to_owned());
    }
    if statistics.media.hour.utilization() >= 80.0 || statistics.media.day.utilization() >= 80.0 {
        out.push("Media uploads are near their limit; reuse uploaded media IDs.".to_owned());
    }
    out
}
