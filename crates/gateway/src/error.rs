use std::time::Duration;

use chatshop_core::ChatShopError;
use thiserror::Error;

/// Errors returned by gateway implementations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Required credentials are missing.
    #[error("gateway not configured: {0}")]
    NotConfigured(String),

    /// The request was rejected before reaching the upstream API.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream API answered with a failure.
    #[error("upstream rejected request: {0}")]
    Upstream(String),

    /// The upstream API did not respond within the allowed duration.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// A network or transport-level error, or an upstream 5xx.
    #[error("connection error: {0}")]
    Connection(String),

    /// The upstream API is throttling us.
    #[error("rate limited by upstream, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    /// A webhook failed signature verification.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// An unparseable request or response body.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl GatewayError {
    /// Returns `true` if the operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connection(_) | Self::RateLimited { .. }
        )
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<GatewayError> for ChatShopError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::NotConfigured(msg) => Self::NotAvailable(msg),
            GatewayError::InvalidRequest(msg) => Self::Validation(msg),
            GatewayError::RateLimited { retry_after } => Self::RateLimited { retry_after },
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// Errors from registry mutation and instantiation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("gateway already registered: {0}")]
    AlreadyRegistered(String),

    #[error("invalid gateway id: {0:?}")]
    InvalidId(String),

    #[error("invalid gateway descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("gateway not registered: {0}")]
    NotRegistered(String),

    /// Premium gateway without a license for it.
    #[error("gateway not available: {0}")]
    NotAvailable(String),

    /// The descriptor names an implementation nobody registered.
    #[error("gateway implementation not found: {0}")]
    ClassNotFound(String),

    #[error("gateway construction failed: {0}")]
    ConstructionFailed(String),
}

impl From<RegistryError> for ChatShopError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::AlreadyRegistered(_)
            | RegistryError::InvalidId(_)
            | RegistryError::InvalidDescriptor(_) => Self::Validation(e.to_string()),
            RegistryError::NotRegistered(id) => Self::NotFound(format!("gateway {id}")),
            RegistryError::NotAvailable(_) => Self::NotAvailable(e.to_string()),
            RegistryError::ClassNotFound(_) | RegistryError::ConstructionFailed(_) => {
                Self::Construction(e.to_string())
            }
        }
    }
}
