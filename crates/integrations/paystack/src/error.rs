use std::time::Duration;

use chatshop_gateway::GatewayError;
use thiserror::Error;

/// Errors specific to the Paystack gateway.
///
/// Converted into [`GatewayError`] at the trait boundary.
#[derive(Debug, Error)]
pub enum PaystackError {
    /// An HTTP-level transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Paystack answered with `status: false` or a 4xx.
    #[error("Paystack API error: {0}")]
    Api(String),

    /// Paystack answered with a 5xx.
    #[error("Paystack server error: HTTP {status}")]
    Server { status: u16 },

    /// HTTP 429 (Too Many Requests).
    #[error("rate limited by Paystack")]
    RateLimited { retry_after: u64 },

    /// The request failed local validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No secret key is configured.
    #[error("Paystack secret key is not configured")]
    MissingSecret,

    /// The webhook signature header is missing or does not match.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// A response or webhook body could not be interpreted.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for PaystackError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<PaystackError> for GatewayError {
    fn from(err: PaystackError) -> Self {
        match err {
            PaystackError::Http(e) => GatewayError::Connection(e.to_string()),
            PaystackError::Timeout(d) => GatewayError::Timeout(d),
            PaystackError::Server { status } => {
                GatewayError::Connection(format!("Paystack returned HTTP {status}"))
            }
            PaystackError::Api(msg) => GatewayError::Upstream(msg),
            PaystackError::RateLimited { retry_after } => GatewayError::RateLimited { retry_after },
            PaystackError::InvalidRequest(msg) => GatewayError::InvalidRequest(msg),
            PaystackError::MissingSecret => {
                GatewayError::NotConfigured("paystack: secret_key is required".into())
            }
            PaystackError::InvalidSignature => GatewayError::InvalidSignature,
            PaystackError::Decode(msg) => GatewayError::Serialization(msg),
        }
    }
}
