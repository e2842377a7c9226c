//! Request ID middleware: propagates or generates a unique ID per request.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Ensures every request carries an `X-Request-Id` header.
///
/// An incoming ID is kept, otherwise a UUID v4 is minted. The ID is echoed
/// on the response and recorded on a span wrapping the admission layer, so
/// rejections and ban warnings can be correlated with the client's request.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(val) = &header {
        req.headers_mut().insert(X_REQUEST_ID.clone(), val.clone());
    }

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    let mut response = next.run(req).instrument(span).await;

    if let Some(val) = header {
        response.headers_mut().insert(X_REQUEST_ID.clone(), val);
    }

    response
}
