//! HTTP API for faucet service

use super::error::FaucetResult;
use super::registry::TokenInfo;
use super::service::{FaucetService, FaucetStatus};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// All faucet routes, without CORS.
pub fn router(service: Arc<FaucetService>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/tokens", get(tokens_handler))
        .route("/api/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .route("/faucet/:token/:address", post(dispense_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Dispense handler
///
/// Replies with plain text: the success message or the error's message.
pub async fn dispense_handler(
    State(service): State<Arc<FaucetService>>,
    Path((token, address)): Path<(String, String)>,
) -> FaucetResult<String> {
    info!("Dispense request: token={} address={}", token, address);

    let dispensed = service.request(&token, &address).await?;
    Ok(dispensed.to_string())
}

/// Supported tokens
pub async fn tokens_handler(State(service): State<Arc<FaucetService>>) -> Json<Vec<TokenInfo>> {
    Json(service.tokens())
}

/// Status handler
pub async fn status_handler(State(service): State<Arc<FaucetService>>) -> Json<FaucetStatus> {
    Json(service.status().await)
}

/// Prometheus metrics
pub async fn metrics_handler(State(service): State<Arc<FaucetService>>) -> impl IntoResponse {
    match service.render_metrics().await {
        Ok((content_type, body)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Liveness text
pub async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, "Faucet is running.")
}
