//! HTTP routes for Coinshop Server.

mod system;
pub mod types;

use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::admission::admission_middleware;
use crate::error::ApiError;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// Builds the application router with only the system endpoints.
pub fn router(state: AppState) -> Router {
    router_with(state, Router::new())
}

/// Builds the application router around a business API.
///
/// `api` carries the coinshop handlers (auth, info, buy, sendCoin). It is
/// merged under the same middleware stack, so every route passes admission
/// control. `api` must not install its own fallback.
pub fn router_with(state: AppState, api: Router) -> Router {
    let app = Router::new()
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics_endpoint))
        .with_state(state.clone())
        .merge(api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http());

    app.layer(middleware::from_fn_with_state(
        state.clone(),
        admission_middleware,
    ))
    .layer(middleware::from_fn(request_id_middleware))
    .layer(cors_layer(&state))
}

async fn not_found(req: Request) -> ApiError {
    ApiError::NotFound(req.uri().path().to_string())
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = state.cors_origins();

    // No origins configured: no CORS headers.
    if origins.is_empty() {
        return CorsLayer::new();
    }

    let x_request_id = axum::http::header::HeaderName::from_static("x-request-id");
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            x_request_id.clone(),
        ])
        .expose_headers([
            x_request_id,
            axum::http::header::RETRY_AFTER,
            axum::http::header::HeaderName::from_static("x-ratelimit-limit"),
            axum::http::header::HeaderName::from_static("x-ratelimit-remaining"),
        ]);

    if origins.len() == 1 && origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard origin, all cross-origin requests allowed");
        base.allow_origin(tower_http::cors::Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        base.allow_origin(parsed)
    }
}
