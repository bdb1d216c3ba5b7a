use thiserror::Error;

/// Errors raised while assembling a [`PaymentOrchestrator`](crate::PaymentOrchestrator).
///
/// Payment operations themselves never fail with this type; they report
/// through the [`OperationResult`](chatshop_core::OperationResult) envelope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    /// A required component was not supplied to the builder.
    #[error("configuration error: {0}")]
    Configuration(String),
}
