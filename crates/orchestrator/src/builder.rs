use std::sync::Arc;

use chatshop_audit::PaymentLogStore;
use chatshop_core::{Clock, EventBus};
use chatshop_gateway::GatewayRegistry;

use crate::error::OrchestratorError;
use crate::metrics::OrchestratorMetrics;
use crate::orchestrator::PaymentOrchestrator;

/// Fluent builder for a [`PaymentOrchestrator`].
///
/// A [`GatewayRegistry`] and a [`PaymentLogStore`] must be supplied. The event
/// bus defaults to the registry's, the clock to wall time, and the reference
/// prefix to `CS`.
#[derive(Default)]
pub struct OrchestratorBuilder {
    registry: Option<Arc<GatewayRegistry>>,
    payment_log: Option<Arc<dyn PaymentLogStore>>,
    events: Option<EventBus>,
    clock: Option<Clock>,
    reference_prefix: Option<String>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn registry(mut self, registry: Arc<GatewayRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the sink every attempt and result is logged to.
    #[must_use]
    pub fn payment_log(mut self, store: Arc<dyn PaymentLogStore>) -> Self {
        self.payment_log = Some(store);
        self
    }

    /// Publish webhook-derived events on `events` instead of the registry's bus.
    #[must_use]
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Prefix for generated payment references.
    #[must_use]
    pub fn reference_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reference_prefix = Some(prefix.into());
        self
    }

    /// Consume the builder and produce a [`PaymentOrchestrator`].
    pub fn build(self) -> Result<PaymentOrchestrator, OrchestratorError> {
        let registry = self
            .registry
            .ok_or_else(|| OrchestratorError::Configuration("gateway registry is required".into()))?;

        let payment_log = self
            .payment_log
            .ok_or_else(|| OrchestratorError::Configuration("payment log is required".into()))?;

        let reference_prefix = self.reference_prefix.unwrap_or_else(|| "CS".to_owned());
        if reference_prefix.trim().is_empty() {
            return Err(OrchestratorError::Configuration(
                "reference prefix must not be empty".into(),
            ));
        }

        let events = self.events.unwrap_or_else(|| registry.events().clone());

        Ok(PaymentOrchestrator {
            registry,
            payment_log,
            events,
            clock: self.clock.unwrap_or_default(),
            metrics: Arc::new(OrchestratorMetrics::default()),
            reference_prefix,
        })
    }
}
