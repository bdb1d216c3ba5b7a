use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chatshop_gateway::WebhookPayload;
use chatshop_orchestrator::RequestContext;
use tracing::debug;

use super::AppState;
use crate::error::ServerError;

/// `POST /webhooks/{gateway_id}` -- hand a raw delivery to the gateway.
///
/// The body is passed through byte-for-byte so the gateway can check its
/// signature. Responds `200` with the result envelope when the delivery is
/// accepted and `400` when it is rejected.
pub async fn receive(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
    request: Request,
) -> Result<impl IntoResponse, ServerError> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| ServerError::BadRequest(format!("unreadable body: {e}")))?;

    let mut payload = WebhookPayload::new(body.to_vec());
    let mut context = RequestContext::new();
    for (name, value) in &parts.headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        payload = payload.with_header(name.as_str(), value);
        context = context.with_header(name.as_str(), value);
    }
    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        context = context.with_remote_addr(addr.ip());
    }

    debug!(gateway = %gateway_id, bytes = body.len(), "webhook received");
    let result = state
        .orchestrator
        .handle_webhook(&gateway_id, &payload, &context)
        .await;

    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(result)))
}
