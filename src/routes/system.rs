//! System and health endpoints.

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::state::AppState;

use super::types::HealthResponse;

/// Check server health.
///
/// Returns server status, version and uptime.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_secs(),
    })
}

/// Prometheus-compatible metrics endpoint.
pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics().render(state.uptime_secs());

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}
