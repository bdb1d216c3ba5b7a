use std::collections::BTreeMap;
use std::fmt;

use chatshop_gateway::GatewayConfig;
use serde::Deserialize;

/// Payment-wide settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    /// Gateway preferred by best-gateway selection.
    #[serde(default)]
    pub default_gateway: Option<String>,
    /// Unlock premium gateways.
    #[serde(default)]
    pub premium: bool,
    /// Outbound gateway request timeout, applied to every gateway that does
    /// not set its own `timeout_seconds` credential.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Prefix of generated transaction references.
    #[serde(default = "default_reference_prefix")]
    pub reference_prefix: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            default_gateway: None,
            premium: false,
            timeout_seconds: default_timeout(),
            reference_prefix: default_reference_prefix(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_reference_prefix() -> String {
    "CS".to_owned()
}

/// One `[gateways.<id>]` section.
#[derive(Clone, Default, Deserialize)]
pub struct GatewaySettings {
    #[serde(default)]
    pub enabled: bool,
    /// Overrides the descriptor's priority. Lower sorts first.
    #[serde(default)]
    pub priority: Option<i32>,
    /// Credentials handed to the gateway constructor. Values of the form
    /// `env:VAR` are read from the environment at load time.
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
}

impl GatewaySettings {
    /// Registry configuration, with the payment-wide timeout filled in.
    pub fn gateway_config(&self, timeout_seconds: u64) -> GatewayConfig {
        let mut config = GatewayConfig {
            credentials: self.credentials.clone(),
        };
        config
            .credentials
            .entry("timeout_seconds".to_owned())
            .or_insert_with(|| timeout_seconds.to_string());
        config
    }
}

impl fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("enabled", &self.enabled)
            .field("priority", &self.priority)
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}
