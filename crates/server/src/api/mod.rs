pub mod health;
pub mod webhooks;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use chatshop_orchestrator::PaymentOrchestrator;
use chatshop_ratelimit::RateLimiter;
use tower_http::trace::TraceLayer;

use crate::bootstrap::Services;

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(services: &Services, max_body_bytes: usize) -> Self {
        Self {
            orchestrator: Arc::clone(&services.orchestrator),
            rate_limiter: Arc::clone(&services.rate_limiter),
            max_body_bytes,
        }
    }
}

/// Build the router: the webhook receiver and the health endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/webhooks/{gateway_id}", post(webhooks::receive))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
