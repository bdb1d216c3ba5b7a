mod payments;
mod server;
mod snapshot;


pub use payments::*;
pub use server::*;
pub use snapshot::*;

use std::collections::BTreeMap;
use std::path::Path;

use chatshop_core::GatewayId;
use chatshop_ratelimit::RateLimitConfig;
use serde::Deserialize;

use crate::error::ServerError;

/// Prefix marking a credential value to be read from the environment.
pub const ENV_PREFIX: &str = "env:";

/// Top-level configuration for the ChatShop server, loaded from a TOML file.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatShopConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Messaging and API quota ceilings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Payment-wide settings.
    #[serde(default)]
    pub payments: PaymentsConfig,
    /// Per-gateway settings keyed by gateway id.
    #[serde(default)]
    pub gateways: BTreeMap<String, GatewaySettings>,
}

impl ChatShopConfig {
    /// Read, parse, resolve `env:` references and validate.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml(&contents)?
        } else {
            Self::default()
        };
        config.resolve_env_with(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ServerError> {
        toml::from_str(contents).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Replace every `env:VAR` credential with the value `lookup` returns
    /// for `VAR`. An unset variable is an error.
    pub fn resolve_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ServerError> {
        for (id, gateway) in &mut self.gateways {
            for (key, value) in &mut gateway.credentials {
                let Some(var) = value.strip_prefix(ENV_PREFIX) else {
                    continue;
                };
                let var = var.trim();
                *value = lookup(var).ok_or_else(|| {
                    ServerError::Config(format!(
                        "gateways.{id}.credentials.{key} references unset environment variable {var}"
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Check the values for internal consistency.
    pub fn validate(&self) -> Result<(), ServerError> {
        self.rate_limit.validate().map_err(ServerError::Config)?;
        if self.payments.timeout_seconds == 0 {
            return Err(ServerError::Config(
                "payments.timeout_seconds must be at least 1".into(),
            ));
        }
        if self.payments.reference_prefix.trim().is_empty() {
            return Err(ServerError::Config(
                "payments.reference_prefix must not be empty".into(),
            ));
        }
        if self.server.sweep_interval_seconds == 0 {
            return Err(ServerError::Config(
                "server.sweep_interval_seconds must be at least 1".into(),
            ));
        }
        for id in self.gateways.keys() {
            if !GatewayId::new(id.as_str()).is_well_formed() {
                return Err(ServerError::Config(format!(
                    "invalid gateway id in [gateways]: {id:?}"
                )));
            }
        }
        if let Some(default) = &self.payments.default_gateway
            && !GatewayId::new(default.as_str()).is_well_formed()
        {
            return Err(ServerError::Config(format!(
                "invalid payments.default_gateway: {default:?}"
            )));
        }
        Ok(())
    }

    /// Masked view for printing.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::from(self)
    }
}
