use async_trait::async_trait;
use parking_lot::RwLock;

use chatshop_audit::error::AuditError;
use chatshop_audit::record::{PaymentLogEntry, PaymentLogPage, PaymentLogQuery};
use chatshop_audit::store::PaymentLogStore;

/// In-memory append-only payment log. Suitable for development and testing.
///
/// Entries are kept in insertion order; queries return them newest first.
#[derive(Debug, Default)]
pub struct MemoryPaymentLog {
    entries: RwLock<Vec<PaymentLogEntry>>,
}

impl MemoryPaymentLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry in insertion order.
    pub fn entries(&self) -> Vec<PaymentLogEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl PaymentLogStore for MemoryPaymentLog {
    async fn append(&self, entry: PaymentLogEntry) -> Result<(), AuditError> {
        self.entries.write().push(entry);
        Ok(())
    }

    async fn query(&self, query: &PaymentLogQuery) -> Result<PaymentLogPage, AuditError> {
        let limit = query.effective_limit();
        let offset = query.effective_offset();

        let mut matching: Vec<PaymentLogEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();

        // Reversed first so the stable sort puts later inserts first among
        // equal timestamps.
        matching.reverse();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total = matching.len() as u64;
        let entries = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(PaymentLogPage {
            entries,
            total,
            limit,
            offset,
        })
    }
}
