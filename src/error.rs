//! Error types for the HTTP layer.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use coinshop_admission::Rejection;

/// API error returned by middleware and handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Refused by admission control (rate limited or banned).
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// No route matched.
    #[error("no route for {0}")]
    NotFound(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    /// Error code (e.g. "rate_limited", "banned", "not_found").
    pub(crate) error: String,
    /// Human-readable error detail, if available.
    pub(crate) detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, retry_after) = match &self {
            ApiError::Rejected(rejection) => (
                StatusCode::TOO_MANY_REQUESTS,
                rejection.code(),
                Some(rejection.retry_after()),
            ),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
        };

        let body = ErrorBody {
            error: error.to_string(),
            detail: Some(self.to_string()),
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(wait) = retry_after {
            // Whole seconds, rounded up so a sub-second window never reads 0.
            let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }
        response
    }
}
