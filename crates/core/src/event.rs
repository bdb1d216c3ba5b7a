use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// A named domain event emitted by the core for external consumers
/// (analytics, automation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A gateway confirmed a successful charge.
    PaymentCompleted {
        gateway: String,
        reference: String,
        /// Amount in major currency units, when the gateway reported one.
        #[serde(default)]
        amount: Option<f64>,
        #[serde(default)]
        currency: Option<String>,
        #[serde(default)]
        customer_email: Option<String>,
        /// Raw gateway payload.
        #[serde(default)]
        data: serde_json::Value,
    },
    /// A gateway reported a failed charge.
    PaymentFailed {
        gateway: String,
        reference: String,
        reason: String,
        #[serde(default)]
        data: serde_json::Value,
    },
    /// A gateway descriptor was added to a registry.
    GatewayRegistered { gateway: String },
    /// A gateway descriptor was removed from a registry.
    GatewayUnregistered { gateway: String },
    /// A component (gateway) was switched on.
    ComponentActivated { component: String },
}

impl DomainEvent {
    /// The stable event name, matching the serialized `event` tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PaymentCompleted { .. } => "payment_completed",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::GatewayRegistered { .. } => "gateway_registered",
            Self::GatewayUnregistered { .. } => "gateway_unregistered",
            Self::ComponentActivated { .. } => "component_activated",
        }
    }
}

/// A [`DomainEvent`] stamped with its emission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DomainEvent,
}

/// Fan-out event bus backed by a tokio broadcast channel.
///
/// The bus does not dictate how subscribers are wired: anyone holding a
/// clone can [`subscribe`](Self::subscribe). Emission is fire-and-forget;
/// slow subscribers lag and lose the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` undelivered events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Create a new receiver observing every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Emit an event. Returns the number of subscribers that will see it.
    pub fn emit(&self, event: DomainEvent) -> usize {
        let name = event.name();
        let envelope = EventEnvelope {
            emitted_at: Utc::now(),
            event,
        };
        match self.tx.send(envelope) {
            Ok(n) => n,
            Err(_) => {
                debug!(event = name, "no subscribers for domain event");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
