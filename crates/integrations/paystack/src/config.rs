use std::fmt;
use std::time::Duration;

use chatshop_gateway::GatewayConfig;

/// Default Paystack API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.paystack.co";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the Paystack gateway.
#[derive(Clone)]
pub struct PaystackConfig {
    /// Secret key, used both as the API bearer token and the webhook HMAC key.
    pub secret_key: String,

    /// Public key. Not needed server-side; carried for inline checkout.
    pub public_key: Option<String>,

    /// Base URL for the Paystack API. Override this for testing against a
    /// mock server.
    pub api_base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl PaystackConfig {
    /// Create a configuration with the given secret key and default endpoint.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            public_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build from registry credentials.
    ///
    /// Recognised keys: `secret_key`, `public_key`, `base_url` and
    /// `timeout_seconds`. A missing secret yields an unconfigured gateway
    /// rather than an error.
    pub fn from_gateway_config(config: &GatewayConfig) -> Self {
        let mut out = Self::new(config.require("secret_key").unwrap_or_default().trim());
        out.public_key = config.require("public_key").map(str::to_owned);
        if let Some(url) = config.require("base_url") {
            out.api_base_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(secs) = config
            .require("timeout_seconds")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            out.timeout = Duration::from_secs(secs);
        }
        out
    }

    #[must_use]
    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    /// Override the API base URL (useful for testing).
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a secret key is present.
    pub fn has_secret(&self) -> bool {
        !self.secret_key.is_empty()
    }
}

impl fmt::Debug for PaystackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaystackConfig")
            .field("secret_key", &"[REDACTED]")
            .field("public_key", &self.public_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
