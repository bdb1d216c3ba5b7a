use std::time::Duration;

use async_trait::async_trait;

use crate::error::StateError;
use crate::key::StateKey;

/// An expiring key-value store with atomic counters.
///
/// Every entry may carry an expiry. A read after the expiry returns `None`
/// (or zero for counters) and the previous value is never observable again,
/// even if the backend has not physically removed it yet.
///
/// Implementations must be `Send + Sync` and safe for concurrent access;
/// [`increment`](Self::increment) in particular must be a single atomic
/// read-modify-write.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Get the raw value for a key. Returns `None` if not found or expired.
    async fn get(&self, key: &StateKey) -> Result<Option<String>, StateError>;

    /// Set a value, replacing any previous value and resetting its expiry.
    /// `None` stores the value without expiry.
    async fn set(&self, key: &StateKey, value: &str, ttl: Option<Duration>)
    -> Result<(), StateError>;

    /// Delete a key. Returns `true` if a live entry existed.
    async fn delete(&self, key: &StateKey) -> Result<bool, StateError>;

    /// Atomically add `delta` to a counter and return the new value.
    ///
    /// A missing or expired counter starts from zero and takes `ttl` as its
    /// expiry. An existing counter keeps the expiry set at its first write;
    /// re-extending it requires an explicit [`set`](Self::set).
    async fn increment(
        &self,
        key: &StateKey,
        delta: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, StateError>;

    /// Atomically subtract `delta` from a live counter, never going below
    /// zero, and return the new value.
    ///
    /// A missing or expired counter stays absent and reports zero; a live
    /// counter keeps its expiry.
    async fn decrement(&self, key: &StateKey, delta: i64) -> Result<i64, StateError>;

    /// Time until the entry expires. `None` when the key is missing, expired,
    /// or stored without expiry.
    async fn ttl_remaining(&self, key: &StateKey) -> Result<Option<Duration>, StateError>;

    /// Read a counter, treating missing or expired entries as zero.
    async fn get_count(&self, key: &StateKey) -> Result<i64, StateError> {
        match self.get(key).await? {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
                StateError::Serialization(format!("counter value is not an integer: {e}"))
            }),
            None => Ok(0),
        }
    }
}
