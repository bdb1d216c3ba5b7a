use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use chatshop_state::error::StateError;
use chatshop_state::key::StateKey;
use chatshop_state::store::CounterStore;

/// A single entry in the in-memory store.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Deadline for an entry written at `now`. A TTL too large to represent
/// means the entry never expires.
fn deadline(now: Instant, ttl: Option<Duration>) -> Option<Instant> {
    ttl.and_then(|d| now.checked_add(d))
}

fn parse_counter(raw: &str) -> Result<i64, StateError> {
    raw.parse()
        .map_err(|e: std::num::ParseIntError| {
            StateError::Serialization(format!("counter value is not an integer: {e}"))
        })
}

/// In-memory [`CounterStore`] backed by a [`DashMap`].
///
/// Entries are lazily evicted on read when their TTL has elapsed; call
/// [`sweep_expired`](Self::sweep_expired) or run [`spawn_sweeper`] to reclaim
/// entries that are never read again. Expiry uses `tokio::time::Instant`, so
/// a paused test runtime controls it with `tokio::time::advance`.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    data: DashMap<String, Entry>,
}

impl MemoryCounterStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every expired entry and return how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.data.len();
        self.data.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.data.len())
    }

    /// Number of physically stored entries, including expired ones not yet
    /// swept.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Spawn a background task that sweeps expired entries every `every`.
///
/// The task runs until the returned handle is aborted or the runtime shuts
/// down.
pub fn spawn_sweeper(store: Arc<MemoryCounterStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = store.sweep_expired();
            if removed > 0 {
                tracing::debug!(removed, "swept expired counter store entries");
            }
        }
    })
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &StateKey) -> Result<Option<String>, StateError> {
        let rendered = key.canonical();

        if let Some(entry) = self.data.get(&rendered) {
            if entry.is_expired(Instant::now()) {
                drop(entry);
                self.data
                    .remove_if(&rendered, |_, e| e.is_expired(Instant::now()));
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }

        Ok(None)
    }

    async fn set(
        &self,
        key: &StateKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), StateError> {
        let expires_at = deadline(Instant::now(), ttl);
        self.data.insert(
            key.canonical(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &StateKey) -> Result<bool, StateError> {
        // Expired entries count as absent.
        match self.data.remove(&key.canonical()) {
            Some((_, entry)) => Ok(!entry.is_expired(Instant::now())),
            None => Ok(false),
        }
    }

    async fn increment(
        &self,
        key: &StateKey,
        delta: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, StateError> {
        let now = Instant::now();
        let fresh = || Entry {
            value: "0".to_owned(),
            expires_at: deadline(now, ttl),
        };

        // The shard lock is held for the whole read-modify-write.
        let mut entry = self.data.entry(key.canonical()).or_insert_with(fresh);
        if entry.is_expired(now) {
            *entry = fresh();
        }

        let new_value = parse_counter(&entry.value)?.saturating_add(delta);
        entry.value = new_value.to_string();
        Ok(new_value)
    }

    async fn decrement(&self, key: &StateKey, delta: i64) -> Result<i64, StateError> {
        let now = Instant::now();
        let rendered = key.canonical();
        let Some(mut entry) = self.data.get_mut(&rendered) else {
            return Ok(0);
        };
        if entry.is_expired(now) {
            drop(entry);
            self.data.remove_if(&rendered, |_, e| e.is_expired(now));
            return Ok(0);
        }

        let new_value = parse_counter(&entry.value)?.saturating_sub(delta).max(0);
        entry.value = new_value.to_string();
        Ok(new_value)
    }

    async fn ttl_remaining(&self, key: &StateKey) -> Result<Option<Duration>, StateError> {
        let now = Instant::now();
        Ok(self.data.get(&key.canonical()).and_then(|entry| {
            entry
                .expires_at
                .filter(|deadline| now < *deadline)
                .map(|deadline| deadline - now)
        }))
    }
}
