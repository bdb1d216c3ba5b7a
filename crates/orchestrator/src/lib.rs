//! Payment orchestration: the caller-facing surface over the gateway registry.
//!
//! [`PaymentOrchestrator`] validates input, resolves a gateway from the
//! [`GatewayRegistry`](chatshop_gateway::GatewayRegistry), delegates to it,
//! writes every attempt and result to a
//! [`PaymentLogStore`](chatshop_audit::PaymentLogStore), and publishes
//! webhook-derived domain events.

pub mod builder;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod request;
pub mod validate;

pub use builder::OrchestratorBuilder;
pub use error::OrchestratorError;
pub use metrics::{MetricsSnapshot, OrchestratorMetrics};
pub use orchestrator::PaymentOrchestrator;
pub use request::{PaymentOptions, RequestContext};
pub use validate::is_valid_email;
