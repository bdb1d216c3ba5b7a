use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A temporary block on sending to a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub contact: String,
    pub reason: String,
    pub blocked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl BlockRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Whole seconds until the block lifts, rounded up.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let ms = (self.expires_at - now).num_milliseconds();
        u64::try_from(ms).map_or(0, |ms| ms.div_ceil(1000))
    }
}

/// One failed send attempt, kept in a bounded per-contact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Append `record`, dropping entries older than `cutoff` and then the oldest
/// entries beyond `cap`.
pub(crate) fn push_bounded(
    list: &mut Vec<FailureRecord>,
    record: FailureRecord,
    cutoff: DateTime<Utc>,
    cap: usize,
) {
    list.retain(|f| f.timestamp >= cutoff);
    list.push(record);
    if list.len() > cap {
        let excess = list.len() - cap;
        list.drain(..excess);
    }
}
