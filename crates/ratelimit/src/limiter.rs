use std::sync::Arc;
use std::time::Duration;

use chatshop_core::Clock;
use chatshop_state::{CounterStore, KeyKind, StateError, StateKey};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, instrument, warn};

use crate::backoff;
use crate::block::{self, BlockRecord, FailureRecord};
use crate::bucket::Bucket;
use crate::config::RateLimitConfig;
use crate::error::RateLimitError;
use crate::report::{
    ApiQuota, ContactQuota, GlobalQuota, HealthReport, MediaQuota, QuotaUsage,
    RateLimitStatistics, optimization_suggestions,
};

/// How long a contact's last-send timestamp is kept for cooldown checks.
const LAST_SEND_RETENTION: Duration = Duration::from_secs(86_400);
/// Longest block a contact can be given; longer requests are clamped.
pub const MAX_BLOCK_DURATION: Duration = Duration::from_secs(365 * 86_400);

/// Outcome of [`RateLimiter::try_acquire_send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendDecision {
    /// Every bucket had room and now counts this send.
    Allowed,
    /// The contact is blocked until `expires_at`.
    Blocked {
        reason: String,
        expires_at: DateTime<Utc>,
    },
    /// `bucket` is at its ceiling; nothing was recorded.
    Limited { bucket: Bucket, retry_after: u64 },
    /// The counter store failed; the send is refused.
    Unavailable,
}

impl SendDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

fn as_count(limit: u64) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Quota enforcement over a shared [`CounterStore`].
///
/// Quota checks fail closed: when the store errors, `can_*` returns `false`.
/// Reporting operations fall back to zero usage instead.
///
/// [`can_send`](Self::can_send) followed by [`record_send`](Self::record_send)
/// is a best-effort pair; concurrent callers may both pass the check and
/// overshoot a ceiling by up to the number of concurrent callers minus one.
/// [`try_acquire_send`](Self::try_acquire_send) is the exact alternative.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
    clock: Clock,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create a limiter with jitter seeded from OS entropy.
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self {
            store,
            config,
            clock: Clock::new(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reseed the jitter source for reproducible backoff delays.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    #[must_use]
    pub fn with_clock(self, clock: Clock) -> Self {
        Self { clock, ..self }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn key(&self, kind: KeyKind, id: impl Into<String>) -> StateKey {
        StateKey::new(self.config.namespace.clone(), kind, id)
    }

    fn bucket_key(&self, bucket: Bucket, contact: &str) -> StateKey {
        self.key(KeyKind::RateLimit, bucket.key_id(contact))
    }

    // -- counters --

    async fn usage(&self, bucket: Bucket, contact: &str) -> Result<QuotaUsage, StateError> {
        let key = self.bucket_key(bucket, contact);
        let used = u64::try_from(self.store.get_count(&key).await?).unwrap_or(0);
        let resets_in = self
            .store
            .ttl_remaining(&key)
            .await?
            .map_or(0, ceil_secs);
        Ok(QuotaUsage::new(used, bucket.limit(&self.config), resets_in))
    }

    async fn usage_or_zero(&self, bucket: Bucket, contact: &str) -> QuotaUsage {
        match self.usage(bucket, contact).await {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, bucket = %bucket, "rate limiter: failed to read usage");
                QuotaUsage::new(0, bucket.limit(&self.config), 0)
            }
        }
    }

    /// First bucket at or above its ceiling, if any.
    async fn first_exceeded(
        &self,
        buckets: &[Bucket],
        contact: &str,
    ) -> Result<Option<Bucket>, StateError> {
        for &bucket in buckets {
            let key = self.bucket_key(bucket, contact);
            let count = self.store.get_count(&key).await?;
            if count >= as_count(bucket.limit(&self.config)) {
                return Ok(Some(bucket));
            }
        }
        Ok(None)
    }

    async fn has_room(&self, buckets: &[Bucket], contact: &str) -> bool {
        match self.first_exceeded(buckets, contact).await {
            Ok(None) => true,
            Ok(Some(bucket)) => {
                debug!(contact, bucket = %bucket, "rate limit reached");
                false
            }
            Err(e) => {
                warn!(error = %e, "rate limiter: counter store unavailable, failing closed");
                false
            }
        }
    }

    async fn bump(&self, buckets: &[Bucket], contact: &str) -> Result<(), RateLimitError> {
        for &bucket in buckets {
            let key = self.bucket_key(bucket, contact);
            self.store.increment(&key, 1, Some(bucket.window())).await?;
        }
        Ok(())
    }

    // -- message sends --

    /// Whether a message may be sent to `contact` now.
    ///
    /// True only when the contact is not blocked and the contact hour/day and
    /// global minute/hour counters are all strictly below their ceilings.
    /// Has no side effects.
    pub async fn can_send(&self, contact: &str) -> bool {
        if self.is_contact_blocked(contact).await {
            debug!(contact, "contact is blocked");
            return false;
        }
        self.has_room(&Bucket::SEND, contact).await
    }

    /// Count a send against every send bucket and stamp the contact's
    /// last-send time.
    #[instrument(skip(self))]
    pub async fn record_send(&self, contact: &str) -> Result<(), RateLimitError> {
        self.bump(&Bucket::SEND, contact).await?;
        self.touch_last_send(contact).await
    }

    /// Check and record a send as one step.
    ///
    /// Each bucket is incremented first and compared afterwards; a bucket
    /// pushed over its ceiling is rolled back together with every bucket
    /// incremented before it, so concurrent callers can never overshoot.
    #[instrument(skip(self))]
    pub async fn try_acquire_send(&self, contact: &str) -> SendDecision {
        match self.block_record(contact).await {
            Ok(Some(block)) => {
                return SendDecision::Blocked {
                    reason: block.reason,
                    expires_at: block.expires_at,
                };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "rate limiter: failed to read block state");
                return SendDecision::Unavailable;
            }
        }

        let mut acquired: Vec<(Bucket, StateKey)> = Vec::with_capacity(Bucket::SEND.len());
        for bucket in Bucket::SEND {
            let key = self.bucket_key(bucket, contact);
            match self.store.increment(&key, 1, Some(bucket.window())).await {
                Ok(value) => {
                    let over = value > as_count(bucket.limit(&self.config));
                    let retry_after = if over {
                        self.store
                            .ttl_remaining(&key)
                            .await
                            .ok()
                            .flatten()
                            .map_or(0, ceil_secs)
                    } else {
                        0
                    };
                    acquired.push((bucket, key));
                    if over {
                        self.rollback(&acquired).await;
                        debug!(bucket = %bucket, retry_after, "send rejected");
                        return SendDecision::Limited {
                            bucket,
                            retry_after,
                        };
                    }
                }
                Err(e) => {
                    warn!(error = %e, "rate limiter: increment failed, failing closed");
                    self.rollback(&acquired).await;
                    return SendDecision::Unavailable;
                }
            }
        }

        if let Err(e) = self.touch_last_send(contact).await {
            warn!(error = %e, "rate limiter: failed to stamp last send");
        }
        SendDecision::Allowed
    }

    async fn rollback(&self, acquired: &[(Bucket, StateKey)]) {
        for (_, key) in acquired {
            if let Err(e) = self.store.decrement(key, 1).await {
                warn!(error = %e, key = %key, "rate limiter: rollback failed");
            }
        }
    }

    /// Seconds until a send to `contact` can succeed: the longest of an
    /// active block and every currently exceeded send bucket. Zero when
    /// nothing is in the way.
    pub async fn get_send_delay(&self, contact: &str) -> u64 {
        let mut delay = match self.block_record(contact).await {
            Ok(Some(block)) => block.remaining_secs(self.clock.now()),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "rate limiter: failed to read block state");
                return self.config.cooldown_seconds;
            }
        };
        for bucket in Bucket::SEND {
            match self.usage(bucket, contact).await {
                Ok(usage) if usage.is_exhausted() => delay = delay.max(usage.resets_in),
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "rate limiter: failed to compute send delay");
                    return self.config.cooldown_seconds;
                }
            }
        }
        delay
    }

    // -- cooldown --

    async fn touch_last_send(&self, contact: &str) -> Result<(), RateLimitError> {
        let key = self.key(KeyKind::LastSend, contact);
        let now = self.clock.now_ms().to_string();
        self.store
            .set(&key, &now, Some(LAST_SEND_RETENTION))
            .await?;
        Ok(())
    }

    async fn last_send_ms(&self, contact: &str) -> Result<Option<i64>, RateLimitError> {
        let key = self.key(KeyKind::LastSend, contact);
        match self.store.get(&key).await? {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e| RateLimitError::Corrupt(format!("last send timestamp: {e}"))),
            None => Ok(None),
        }
    }

    /// Seconds left before `contact` may be messaged again under a cooldown
    /// of `cooldown_seconds` since the last send.
    pub async fn get_cooldown_remaining(&self, contact: &str, cooldown_seconds: u64) -> u64 {
        match self.last_send_ms(contact).await {
            Ok(last) => self.cooldown_left(last, cooldown_seconds),
            Err(e) => {
                warn!(error = %e, "rate limiter: failed to read last send, failing closed");
                cooldown_seconds
            }
        }
    }

    fn cooldown_left(&self, last_send_ms: Option<i64>, cooldown_seconds: u64) -> u64 {
        let Some(last) = last_send_ms else {
            return 0;
        };
        let elapsed_ms = u64::try_from(self.clock.now_ms() - last).unwrap_or(0);
        let cooldown_ms = cooldown_seconds.saturating_mul(1000);
        ceil_secs(Duration::from_millis(cooldown_ms.saturating_sub(elapsed_ms)))
    }

    pub async fn is_in_cooldown(&self, contact: &str, cooldown_seconds: u64) -> bool {
        self.get_cooldown_remaining(contact, cooldown_seconds).await > 0
    }

    // -- blocking --

    /// Block `contact` for `duration`, clamped to [`MAX_BLOCK_DURATION`].
    /// Replaces any existing block.
    #[instrument(skip(self))]
    pub async fn block_contact(
        &self,
        contact: &str,
        duration: Duration,
        reason: &str,
    ) -> Result<BlockRecord, RateLimitError> {
        let duration = duration.min(MAX_BLOCK_DURATION);
        let blocked_at = self.clock.now();
        let expires_at =
            blocked_at + TimeDelta::from_std(duration).unwrap_or_else(|_| TimeDelta::days(365));
        let record = BlockRecord {
            contact: contact.to_owned(),
            reason: reason.to_owned(),
            blocked_at,
            expires_at,
        };
        let key = self.key(KeyKind::Block, contact);
        self.store
            .set(&key, &serde_json::to_string(&record)?, Some(duration))
            .await?;
        info!(contact, reason, seconds = duration.as_secs(), "contact blocked");
        Ok(record)
    }

    /// The active block for `contact`, if any.
    pub async fn block_record(&self, contact: &str) -> Result<Option<BlockRecord>, RateLimitError> {
        let key = self.key(KeyKind::Block, contact);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        let record: BlockRecord = serde_json::from_str(&raw)?;
        Ok(record.is_active(self.clock.now()).then_some(record))
    }

    /// Whether `contact` is currently blocked. Store errors count as blocked.
    pub async fn is_contact_blocked(&self, contact: &str) -> bool {
        match self.block_record(contact).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                warn!(error = %e, "rate limiter: failed to read block state, failing closed");
                true
            }
        }
    }

    /// Lift a block. Returns `true` if one was active.
    pub async fn unblock_contact(&self, contact: &str) -> Result<bool, RateLimitError> {
        let removed = self
            .store
            .delete(&self.key(KeyKind::Block, contact))
            .await?;
        if removed {
            info!(contact, "contact unblocked");
        }
        Ok(removed)
    }

    // -- failures --

    /// Recent failures for `contact`, oldest first.
    pub async fn failures(&self, contact: &str) -> Result<Vec<FailureRecord>, RateLimitError> {
        let key = self.key(KeyKind::Failures, contact);
        match self.store.get(&key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Append a failed send to the contact's bounded failure list.
    ///
    /// Once the auto-block threshold is reached the contact is blocked for
    /// the configured duration. Returns `true` when this call blocked it.
    #[instrument(skip(self))]
    pub async fn record_failed_send(
        &self,
        contact: &str,
        reason: &str,
    ) -> Result<bool, RateLimitError> {
        let now = self.clock.now();
        let retention = self.config.failure_retention();
        let cutoff = now - TimeDelta::from_std(retention).unwrap_or_else(|_| TimeDelta::days(1));

        let mut list = self.failures(contact).await?;
        block::push_bounded(
            &mut list,
            FailureRecord {
                timestamp: now,
                reason: reason.to_owned(),
            },
            cutoff,
            self.config.failure_list_cap,
        );
        let key = self.key(KeyKind::Failures, contact);
        self.store
            .set(&key, &serde_json::to_string(&list)?, Some(retention))
            .await?;

        if self.recent_failures(&list, now) < self.config.auto_block_threshold {
            return Ok(false);
        }
        if self.block_record(contact).await?.is_some() {
            return Ok(false);
        }
        let reason = format!(
            "auto-blocked after {} failed sends",
            self.config.auto_block_threshold
        );
        self.block_contact(contact, self.config.auto_block_duration(), &reason)
            .await?;
        Ok(true)
    }

    fn recent_failures(&self, list: &[FailureRecord], now: DateTime<Utc>) -> usize {
        let window = TimeDelta::from_std(self.config.auto_block_window())
            .unwrap_or_else(|_| TimeDelta::hours(1));
        let since = now - window;
        list.iter().filter(|f| f.timestamp >= since).count()
    }

    /// Whether the contact has at least the threshold of failures within the
    /// auto-block window.
    pub async fn should_auto_block(&self, contact: &str) -> bool {
        match self.failures(contact).await {
            Ok(list) => {
                self.recent_failures(&list, self.clock.now()) >= self.config.auto_block_threshold
            }
            Err(e) => {
                warn!(error = %e, "rate limiter: failed to read failure list");
                false
            }
        }
    }

    /// Delay before retry `attempt` for `contact`: exponential in the
    /// attempt number up to the configured cap, plus up to
    /// `backoff_jitter_ratio` of random jitter.
    pub fn calculate_backoff_delay(&self, contact: &str, attempt: u32) -> Duration {
        let base = backoff::base_delay(
            self.config.backoff_base_seconds,
            self.config.backoff_max_seconds,
            attempt,
        );
        let ratio = self.config.backoff_jitter_ratio;
        let delay = backoff::with_jitter(base, ratio, &mut *self.rng.lock());
        debug!(contact, attempt, delay_ms = delay.as_millis(), "computed backoff");
        delay
    }

    /// Clear every counter, block, failure and cooldown entry for `contact`.
    pub async fn reset_contact(&self, contact: &str) -> Result<(), RateLimitError> {
        for bucket in Bucket::SEND.into_iter().filter(|b| b.is_per_contact()) {
            self.store.delete(&self.bucket_key(bucket, contact)).await?;
        }
        for kind in [KeyKind::Block, KeyKind::Failures, KeyKind::LastSend] {
            self.store.delete(&self.key(kind, contact)).await?;
        }
        info!(contact, "contact rate limit state reset");
        Ok(())
    }

    // -- API calls and media --

    pub async fn can_make_api_call(&self) -> bool {
        self.has_room(&Bucket::API, "").await
    }

    pub async fn record_api_call(&self) -> Result<(), RateLimitError> {
        self.bump(&Bucket::API, "").await
    }

    pub async fn can_upload_media(&self) -> bool {
        self.has_room(&Bucket::MEDIA, "").await
    }

    pub async fn record_media_upload(&self) -> Result<(), RateLimitError> {
        self.bump(&Bucket::MEDIA, "").await
    }

    // -- reporting --

    pub async fn get_contact_quota(&self, contact: &str) -> ContactQuota {
        ContactQuota {
            contact: contact.to_owned(),
            hour: self.usage_or_zero(Bucket::ContactHour, contact).await,
            day: self.usage_or_zero(Bucket::ContactDay, contact).await,
            blocked: self.block_record(contact).await.ok().flatten().is_some(),
            cooldown_remaining: self
                .last_send_ms(contact)
                .await
                .map_or(0, |last| self.cooldown_left(last, self.config.cooldown_seconds)),
        }
    }

    pub async fn get_global_quota(&self) -> GlobalQuota {
        GlobalQuota {
            minute: self.usage_or_zero(Bucket::GlobalMinute, "").await,
            hour: self.usage_or_zero(Bucket::GlobalHour, "").await,
        }
    }

    pub async fn get_api_quota(&self) -> ApiQuota {
        ApiQuota {
            minute: self.usage_or_zero(Bucket::ApiMinute, "").await,
            hour: self.usage_or_zero(Bucket::ApiHour, "").await,
        }
    }

    pub async fn get_media_quota(&self) -> MediaQuota {
        MediaQuota {
            hour: self.usage_or_zero(Bucket::MediaHour, "").await,
            day: self.usage_or_zero(Bucket::MediaDay, "").await,
        }
    }

    pub async fn get_statistics(&self) -> RateLimitStatistics {
        RateLimitStatistics {
            global: self.get_global_quota().await,
            api: self.get_api_quota().await,
            media: self.get_media_quota().await,
        }
    }

    pub async fn health_check(&self) -> HealthReport {
        HealthReport::from_statistics(self.get_statistics().await)
    }

    pub async fn get_optimization_suggestions(&self) -> Vec<String> {
        optimization_suggestions(&self.get_statistics().await)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chatshop_state_memory::MemoryCounterStore;

    use super::*;

    fn limiter(config: RateLimitConfig) -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryCounterStore::new()), config).with_seed(42)
    }

    fn small() -> RateLimitConfig {
        RateLimitConfig {
            contact_per_hour: 3,
            contact_per_day: 5,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn contact_hour_ceiling() {
        let rl = limiter(small());
        for _ in 0..3 {
            assert!(rl.can_send("+234800").await);
            rl.record_send("+234800").await.unwrap();
        }
        assert!(!rl.can_send("+234800").await);
        assert!(rl.can_send("+234801").await, "other contacts unaffected");

        let delay = rl.get_send_delay("+234800").await;
        assert!(delay > 3500 && delay <= 3600, "delay was {delay}");

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert!(rl.can_send("+234800").await);
        assert_eq!(rl.get_send_delay("+234800").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn send_delay_is_max_of_exceeded_buckets() {
        let rl = limiter(RateLimitConfig {
            contact_per_hour: 1,
            contact_per_day: 2,
            ..Default::default()
        });
        rl.record_send("c").await.unwrap();
        tokio::time::advance(Duration::from_secs(3601)).await;
        rl.record_send("c").await.unwrap();

        let delay = rl.get_send_delay("c").await;
        let day_left = 86_400 - 3601;
        assert_eq!(delay, day_left);
    }

    #[tokio::test(start_paused = true)]
    async fn global_minute_ceiling() {
        let rl = limiter(RateLimitConfig {
            global_per_minute: 2,
            ..Default::default()
        });
        rl.record_send("a").await.unwrap();
        rl.record_send("b").await.unwrap();
        assert!(!rl.can_send("c").await);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(rl.can_send("c").await);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_tracks_last_send() {
        let rl = limiter(RateLimitConfig::default());
        assert!(!rl.is_in_cooldown("c", 60).await);
        rl.record_send("c").await.unwrap();
        assert!(rl.is_in_cooldown("c", 60).await);
        assert_eq!(rl.get_cooldown_remaining("c", 60).await, 60);

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(rl.get_cooldown_remaining("c", 60).await, 15);

        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(!rl.is_in_cooldown("c", 60).await);
    }

    #[tokio::test(start_paused = true)]
    async fn block_and_expiry() {
        let rl = limiter(RateLimitConfig::default());
        let rec = rl
            .block_contact("c", Duration::from_secs(600), "spam reports")
            .await
            .unwrap();
        assert_eq!(rec.reason, "spam reports");
        assert!(rl.is_contact_blocked("c").await);
        assert!(!rl.can_send("c").await);

        tokio::time::advance(Duration::from_secs(601)).await;
        assert!(!rl.is_contact_blocked("c").await);
        assert!(rl.can_send("c").await);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_contact_reports_send_delay() {
        let rl = limiter(RateLimitConfig::default());
        assert_eq!(rl.get_send_delay("c").await, 0);

        rl.block_contact("c", Duration::from_secs(600), "manual")
            .await
            .unwrap();
        assert!(!rl.can_send("c").await);
        assert_eq!(rl.get_send_delay("c").await, 600);

        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(rl.get_send_delay("c").await, 400);

        tokio::time::advance(Duration::from_secs(401)).await;
        assert!(rl.can_send("c").await);
        assert_eq!(rl.get_send_delay("c").await, 0);
    }

    #[tokio::test]
    async fn unbounded_block_is_clamped() {
        let rl = limiter(RateLimitConfig::default());
        let rec = rl
            .block_contact("c", Duration::MAX, "permanent")
            .await
            .unwrap();
        assert_eq!(rec.expires_at - rec.blocked_at, TimeDelta::days(365));
        assert!(rl.is_contact_blocked("c").await);
        assert!(rl.get_send_delay("c").await > 0);
    }

    #[tokio::test]
    async fn huge_auto_block_duration_still_blocks() {
        let rl = limiter(RateLimitConfig {
            auto_block_duration_seconds: u64::MAX,
            ..Default::default()
        });
        for i in 0..5 {
            rl.record_failed_send("c", &format!("err {i}")).await.unwrap();
        }
        assert!(rl.is_contact_blocked("c").await);
    }

    #[tokio::test]
    async fn unblock() {
        let rl = limiter(RateLimitConfig::default());
        rl.block_contact("c", Duration::from_secs(600), "manual")
            .await
            .unwrap();
        assert!(rl.unblock_contact("c").await.unwrap());
        assert!(!rl.is_contact_blocked("c").await);
        assert!(!rl.unblock_contact("c").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn five_failures_within_hour_auto_block() {
        let rl = limiter(RateLimitConfig::default());
        for i in 0..4 {
            assert!(!rl.record_failed_send("c", &format!("err {i}")).await.unwrap());
            tokio::time::advance(Duration::from_secs(60)).await;
        }
        assert!(!rl.should_auto_block("c").await);
        assert!(rl.record_failed_send("c", "err 4").await.unwrap());
        assert!(rl.should_auto_block("c").await);
        assert!(rl.is_contact_blocked("c").await);

        let block = rl.block_record("c").await.unwrap().unwrap();
        assert_eq!(block.expires_at - block.blocked_at, TimeDelta::hours(1));
    }

    #[tokio::test(start_paused = true)]
    async fn spread_failures_do_not_auto_block() {
        let rl = limiter(RateLimitConfig::default());
        for i in 0..5 {
            assert!(!rl.record_failed_send("c", &format!("err {i}")).await.unwrap());
            tokio::time::advance(Duration::from_secs(3601)).await;
        }
        assert!(!rl.should_auto_block("c").await);
        assert!(!rl.is_contact_blocked("c").await);
    }

    #[tokio::test]
    async fn failure_list_is_capped() {
        let rl = limiter(RateLimitConfig {
            auto_block_threshold: 100,
            failure_list_cap: 100,
            ..Default::default()
        });
        for i in 0..12 {
            rl.record_failed_send("c", &format!("err {i}")).await.unwrap();
        }
        assert_eq!(rl.failures("c").await.unwrap().len(), 12);

        let rl = limiter(RateLimitConfig {
            auto_block_threshold: 10,
            ..Default::default()
        });
        for i in 0..12 {
            rl.record_failed_send("c", &format!("err {i}")).await.unwrap();
        }
        let list = rl.failures("c").await.unwrap();
        assert_eq!(list.len(), 10);
        assert_eq!(list[0].reason, "err 2");
    }

    #[test]
    fn backoff_is_monotonic_and_capped() {
        let rl = limiter(RateLimitConfig::default());
        let mut previous = Duration::ZERO;
        for k in 1..=9 {
            let d = rl.calculate_backoff_delay("c", k);
            assert!(d >= previous, "attempt {k}: {d:?} < {previous:?}");
            previous = d;
        }
        for k in 9..40 {
            let d = rl.calculate_backoff_delay("c", k);
            assert!(d >= Duration::from_secs(300));
            assert!(d <= Duration::from_secs(330));
        }
    }

    #[test]
    fn seeded_backoff_is_reproducible() {
        let a = limiter(RateLimitConfig::default());
        let b = limiter(RateLimitConfig::default());
        for k in 0..12 {
            assert_eq!(
                a.calculate_backoff_delay("c", k),
                b.calculate_backoff_delay("c", k)
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn try_acquire_never_overshoots() {
        let rl = limiter(small());
        for _ in 0..3 {
            assert!(rl.try_acquire_send("c").await.is_allowed());
        }
        let decision = rl.try_acquire_send("c").await;
        assert!(matches!(
            decision,
            SendDecision::Limited {
                bucket: Bucket::ContactHour,
                retry_after: 3600
            }
        ));
        let quota = rl.get_contact_quota("c").await;
        assert_eq!(quota.hour.used, 3, "rejected attempt rolled back");
        assert_eq!(quota.day.used, 3);
        assert_eq!(rl.get_global_quota().await.minute.used, 3);
    }

    #[tokio::test]
    async fn try_acquire_rejects_blocked() {
        let rl = limiter(RateLimitConfig::default());
        rl.block_contact("c", Duration::from_secs(60), "manual")
            .await
            .unwrap();
        let decision = rl.try_acquire_send("c").await;
        assert!(matches!(decision, SendDecision::Blocked { .. }));
        assert_eq!(rl.get_global_quota().await.minute.used, 0);
    }

    #[tokio::test]
    async fn api_and_media_ceilings() {
        let rl = limiter(RateLimitConfig {
            api_per_minute: 2,
            media_per_hour: 1,
            ..Default::default()
        });
        assert!(rl.can_make_api_call().await);
        rl.record_api_call().await.unwrap();
        rl.record_api_call().await.unwrap();
        assert!(!rl.can_make_api_call().await);

        assert!(rl.can_upload_media().await);
        rl.record_media_upload().await.unwrap();
        assert!(!rl.can_upload_media().await);
    }

    #[tokio::test]
    async fn reset_contact_clears_state() {
        let rl = limiter(small());
        for _ in 0..3 {
            rl.record_send("c").await.unwrap();
        }
        rl.block_contact("c", Duration::from_secs(60), "x")
            .await
            .unwrap();
        rl.record_failed_send("c", "boom").await.unwrap();

        rl.reset_contact("c").await.unwrap();
        assert!(rl.can_send("c").await);
        assert!(!rl.is_in_cooldown("c", 60).await);
        assert!(rl.failures("c").await.unwrap().is_empty());
        assert_eq!(rl.get_global_quota().await.hour.used, 3);
    }

    #[tokio::test]
    async fn health_reports_exhausted_api_minute() {
        let rl = limiter(RateLimitConfig {
            api_per_minute: 1,
            ..Default::default()
        });
        assert_eq!(
            rl.health_check().await.status,
            crate::report::HealthStatus::Healthy
        );
        rl.record_api_call().await.unwrap();
        assert_eq!(
            rl.health_check().await.status,
            crate::report::HealthStatus::Critical
        );
        assert!(!rl.get_optimization_suggestions().await.is_empty());
    }

    struct FailingStore;

    #[async_trait]
    impl CounterStore for FailingStore {
        async fn get(&self, _: &StateKey) -> Result<Option<String>, StateError> {
            Err(StateError::Connection("down".into()))
        }
        async fn set(&self, _: &StateKey, _: &str, _: Option<Duration>) -> Result<(), StateError> {
            Err(StateError::Connection("down".into()))
        }
        async fn delete(&self, _: &StateKey) -> Result<bool, StateError> {
            Err(StateError::Connection("down".into()))
        }
        async fn increment(
            &self,
            _: &StateKey,
            _: i64,
            _: Option<Duration>,
        ) -> Result<i64, StateError> {
            Err(StateError::Connection("down".into()))
        }
        async fn decrement(&self, _: &StateKey, _: i64) -> Result<i64, StateError> {
            Err(StateError::Connection("down".into()))
        }
        async fn ttl_remaining(&self, _: &StateKey) -> Result<Option<Duration>, StateError> {
            Err(StateError::Connection("down".into()))
        }
    }

    #[tokio::test]
    async fn store_outage_fails_closed() {
        let rl = RateLimiter::new(Arc::new(FailingStore), RateLimitConfig::default());
        assert!(!rl.can_send("c").await);
        assert!(!rl.can_make_api_call().await);
        assert!(rl.record_send("c").await.is_err());
        assert_eq!(rl.try_acquire_send("c").await, SendDecision::Unavailable);
        assert_eq!(rl.get_send_delay("c").await, 60);

        let stats = rl.get_statistics().await;
        assert_eq!(stats.global.hour.used, 0);
        assert_eq!(stats.global.hour.limit, 1000);
    }
}
