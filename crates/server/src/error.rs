use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chatshop_gateway::RegistryError;
use chatshop_orchestrator::OrchestratorError;
use thiserror::Error;

/// Errors that can occur when running the ChatShop server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. reading the config file or binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Gateway registration or configuration failed during bootstrap.
    #[error("gateway registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The orchestrator could not be assembled.
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    /// The request body could not be read.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) | Self::Registry(_) | Self::Orchestrator(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
