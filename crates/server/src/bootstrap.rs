//! Assemble the service graph from configuration.

use std::sync::Arc;

use chatshop_audit_memory::MemoryPaymentLog;
use chatshop_core::{EventBus, GatewayId};
use chatshop_gateway::{GatewayRegistry, LicenseCheck, RegistryError, StaticLicense};
use chatshop_orchestrator::PaymentOrchestrator;
use chatshop_ratelimit::RateLimiter;
use chatshop_state_memory::MemoryCounterStore;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ChatShopConfig;
use crate::error::ServerError;

/// Everything the server wires together at startup.
#[derive(Debug, Clone)]
pub struct Services {
    pub store: Arc<MemoryCounterStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub registry: Arc<GatewayRegistry>,
    pub payment_log: Arc<MemoryPaymentLog>,
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub events: EventBus,
}

/// Build the services with the built-in gateway set.
pub fn build(config: &ChatShopConfig) -> Result<Services, ServerError> {
    build_with(config, chatshop_paystack::install)
}

/// Build the services, registering gateways through `install`.
///
/// Gateways listed under `[gateways]` are configured, re-prioritised and
/// enabled after `install` runs. Sections naming a gateway that `install`
/// did not register are skipped with a warning.
pub fn build_with(
    config: &ChatShopConfig,
    install: impl FnOnce(&GatewayRegistry) -> Result<(), RegistryError>,
) -> Result<Services, ServerError> {
    let events = EventBus::default();

    let license: Arc<dyn LicenseCheck> = if config.payments.premium {
        Arc::new(StaticLicense::premium())
    } else {
        Arc::new(StaticLicense::free())
    };
    let registry = Arc::new(GatewayRegistry::new(events.clone()).with_license(license));
    install(&*registry)?;

    for (id, settings) in &config.gateways {
        if !registry.is_registered(id) {
            warn!(gateway = %id, "no implementation for configured gateway, skipping");
            continue;
        }
        registry.configure(id, settings.gateway_config(config.payments.timeout_seconds))?;
        if let Some(priority) = settings.priority {
            registry.set_priority(id, priority)?;
        }
        if settings.enabled {
            registry.enable(id)?;
        }
    }

    if let Some(default) = &config.payments.default_gateway {
        if !registry.is_registered(default) {
            warn!(gateway = %default, "default gateway is not registered");
        }
        registry.set_default_gateway(Some(GatewayId::new(default.as_str())));
    }

    let store = Arc::new(MemoryCounterStore::new());
    let rate_limiter = Arc::new(RateLimiter::new(store.clone(), config.rate_limit.clone()));
    let payment_log = Arc::new(MemoryPaymentLog::new());

    let orchestrator = Arc::new(
        PaymentOrchestrator::builder()
            .registry(Arc::clone(&registry))
            .payment_log(payment_log.clone())
            .events(events.clone())
            .reference_prefix(config.payments.reference_prefix.clone())
            .build()?,
    );

    info!(
        gateways = registry.ids().len(),
        enabled = registry.available(true).len(),
        premium = config.payments.premium,
        "services initialized"
    );

    Ok(Services {
        store,
        rate_limiter,
        registry,
        payment_log,
        orchestrator,
        events,
    })
}

/// Log every domain event published on `events` until the bus closes.
pub fn spawn_event_logger(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => info!(
                    event = envelope.event.name(),
                    emitted_at = %envelope.emitted_at,
                    "domain event"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event logger lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
