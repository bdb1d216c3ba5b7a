use axum::Json;
use axum::extract::State;
use chatshop_orchestrator::MetricsSnapshot;
use chatshop_ratelimit::{HealthReport, HealthStatus};
use serde::Serialize;

use super::AppState;

/// An enabled gateway as listed by `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct GatewaySummary {
    pub id: String,
    pub name: String,
    pub priority: i32,
    pub default: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when a quota is exhausted.
    pub status: String,
    pub rate_limit: HealthReport,
    pub metrics: MetricsSnapshot,
    /// Enabled gateways, highest priority first.
    pub gateways: Vec<GatewaySummary>,
}

/// `GET /health` -- quota health, orchestrator counters and enabled
/// gateways.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let rate_limit = state.rate_limiter.health_check().await;
    let registry = state.orchestrator.registry();
    let default = registry.default_gateway();

    let gateways = registry
        .enabled_sorted_by_priority()
        .into_iter()
        .map(|d| GatewaySummary {
            default: default.as_ref() == Some(&d.id),
            id: d.id.to_string(),
            name: d.display_name,
            priority: d.priority,
        })
        .collect();

    let status = if rate_limit.status == HealthStatus::Critical {
        "degraded"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status: status.to_owned(),
        rate_limit,
        metrics: state.orchestrator.metrics().snapshot(),
        gateways,
    })
}
