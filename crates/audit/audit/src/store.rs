use async_trait::async_trait;

use crate::error::AuditError;
use crate::record::{PaymentLogEntry, PaymentLogPage, PaymentLogQuery};

/// Append-only sink for payment log entries.
///
/// Entries are never mutated or removed once appended. Implementations must
/// be `Send + Sync` to be shared across async tasks.
#[async_trait]
pub trait PaymentLogStore: Send + Sync {
    /// Persist a log entry.
    async fn append(&self, entry: PaymentLogEntry) -> Result<(), AuditError>;

    /// Query entries with filters and pagination, newest first.
    async fn query(&self, query: &PaymentLogQuery) -> Result<PaymentLogPage, AuditError>;
}
