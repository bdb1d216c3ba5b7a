use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The operation a payment log entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAction {
    PaymentAttempt,
    PaymentResult,
    Verification,
    VerificationResult,
    PaymentLinkGeneration,
    PaymentLinkResult,
    Webhook,
}

impl PaymentAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PaymentAttempt => "payment_attempt",
            Self::PaymentResult => "payment_result",
            Self::Verification => "verification",
            Self::VerificationResult => "verification_result",
            Self::PaymentLinkGeneration => "payment_link_generation",
            Self::PaymentLinkResult => "payment_link_result",
            Self::Webhook => "webhook",
        }
    }
}

impl std::fmt::Display for PaymentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status recorded alongside a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// An attempt that has not produced a result yet.
    Pending,
    Success,
    Failed,
}

/// A single immutable payment log record.
///
/// One entry is written per attempt, result, verification and webhook event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLogEntry {
    pub action: PaymentAction,
    pub gateway: String,
    /// Payment reference, when one is known at the time of writing.
    pub reference: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
    pub status: PaymentStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
}

impl PaymentLogEntry {
    /// Start an entry for `action` on `gateway`; the remaining fields are
    /// filled with the `with_*` builders.
    #[must_use]
    pub fn new(
        action: PaymentAction,
        gateway: impl Into<String>,
        status: PaymentStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            gateway: gateway.into(),
            reference: None,
            amount: None,
            currency: None,
            customer_email: None,
            status,
            message: String::new(),
            timestamp,
            ip_address: "0.0.0.0".to_owned(),
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    #[must_use]
    pub fn with_amount(mut self, amount: f64, currency: impl Into<String>) -> Self {
        self.amount = Some(amount);
        self.currency = Some(currency.into());
        self
    }

    #[must_use]
    pub fn with_customer_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = ip.into();
        self
    }
}

/// Query parameters for searching the payment log.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PaymentLogQuery {
    pub action: Option<PaymentAction>,
    pub gateway: Option<String>,
    pub reference: Option<String>,
    pub status: Option<PaymentStatus>,
    /// Only entries written at or after this time.
    pub from: Option<DateTime<Utc>>,
    /// Only entries written at or before this time.
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of entries to return (default 50, max 1000).
    pub limit: Option<u32>,
    /// Number of entries to skip for pagination.
    pub offset: Option<u32>,
}

impl PaymentLogQuery {
    /// Return the effective limit, clamped to 1..=1000, defaulting to 50.
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(50).clamp(1, 1000)
    }

    /// Return the effective offset, defaulting to 0.
    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    /// Whether `entry` passes every filter set on this query.
    pub fn matches(&self, entry: &PaymentLogEntry) -> bool {
        if self.action.is_some_and(|a| a != entry.action) {
            return false;
        }
        if self.status.is_some_and(|s| s != entry.status) {
            return false;
        }
        if let Some(ref gateway) = self.gateway {
            if entry.gateway != *gateway {
                return false;
            }
        }
        if let Some(ref reference) = self.reference {
            if entry.reference.as_deref() != Some(reference.as_str()) {
                return false;
            }
        }
        if self.from.is_some_and(|from| entry.timestamp < from) {
            return false;
        }
        if self.to.is_some_and(|to| entry.timestamp > to) {
            return false;
        }
        true
    }
}

/// A paginated page of payment log entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLogPage {
    pub entries: Vec<PaymentLogEntry>,
    /// Total number of entries matching the query (before pagination).
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}
