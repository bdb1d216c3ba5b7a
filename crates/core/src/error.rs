use thiserror::Error;

/// Caller-facing error taxonomy shared by the rate limiter, gateway registry
/// and payment orchestrator.
///
/// Every public operation that can fail reports one of these kinds; the
/// orchestrator folds them into an [`OperationResult`](crate::OperationResult)
/// instead of returning them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatShopError {
    /// Bad input: amount, currency, email, missing gateway id.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown gateway, contact or reference.
    #[error("not found: {0}")]
    NotFound(String),

    /// License-gated or disabled gateway.
    #[error("not available: {0}")]
    NotAvailable(String),

    /// Gateway instantiation failed.
    #[error("construction failed: {0}")]
    Construction(String),

    /// The external payment or messaging API failed or was unreachable.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A quota was exceeded; retry after the given number of seconds.
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited {
        /// Seconds until the exceeded bucket resets.
        retry_after: u64,
    },
}

impl ChatShopError {
    /// Short, stable tag for logs and envelope payloads.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::NotAvailable(_) => "not_available",
            Self::Construction(_) => "construction",
            Self::Upstream(_) => "upstream",
            Self::RateLimited { .. } => "rate_limited",
        }
    }

    /// Returns `true` if the caller may retry the operation later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::RateLimited { .. })
    }
}
