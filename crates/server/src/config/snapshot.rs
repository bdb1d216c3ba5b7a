use std::collections::BTreeMap;

use chatshop_ratelimit::RateLimitConfig;
use serde::Serialize;

use super::{ChatShopConfig, GatewaySettings, LogFormat};

const MASK: &str = "****";

/// Keep a short prefix of long secrets so operators can tell test keys from
/// live ones; hide short values completely.
fn mask(value: &str) -> String {
    if value.chars().count() >= 12 {
        let prefix: String = value.chars().take(3).collect();
        format!("{prefix}{MASK}")
    } else {
        MASK.to_owned()
    }
}

/// Resolved configuration with every credential masked. Safe to print or
/// expose.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub server: ServerSnapshot,
    pub logging: LoggingSnapshot,
    pub rate_limit: RateLimitConfig,
    pub payments: PaymentsSnapshot,
    pub gateways: BTreeMap<String, GatewaySnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerSnapshot {
    pub host: String,
    pub port: u16,
    pub sweep_interval_seconds: u64,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggingSnapshot {
    pub format: LogFormat,
    pub level: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentsSnapshot {
    pub default_gateway: Option<String>,
    pub premium: bool,
    pub timeout_seconds: u64,
    pub reference_prefix: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewaySnapshot {
    pub enabled: bool,
    pub priority: Option<i32>,
    pub credentials: BTreeMap<String, String>,
}

impl From<&GatewaySettings> for GatewaySnapshot {
    fn from(g: &GatewaySettings) -> Self {
        Self {
            enabled: g.enabled,
            priority: g.priority,
            credentials: g
                .credentials
                .iter()
                .map(|(k, v)| (k.clone(), mask(v)))
                .collect(),
        }
    }
}

impl From<&ChatShopConfig> for ConfigSnapshot {
    fn from(c: &ChatShopConfig) -> Self {
        Self {
            server: ServerSnapshot {
                host: c.server.host.clone(),
                port: c.server.port,
                sweep_interval_seconds: c.server.sweep_interval_seconds,
                max_body_bytes: c.server.max_body_bytes,
            },
            logging: LoggingSnapshot {
                format: c.logging.format,
                level: c.logging.level.clone(),
            },
            rate_limit: c.rate_limit.clone(),
            payments: PaymentsSnapshot {
                default_gateway: c.payments.default_gateway.clone(),
                premium: c.payments.premium,
                timeout_seconds: c.payments.timeout_seconds,
                reference_prefix: c.payments.reference_prefix.clone(),
            },
            gateways: c
                .gateways
                .iter()
                .map(|(id, g)| (id.clone(), GatewaySnapshot::from(g)))
                .collect(),
        }
    }
}
