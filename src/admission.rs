//! Admission-control middleware: bans, per-endpoint quotas, error escalation.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use coinshop_admission::{Outcome, WindowVerdict};

use crate::error::ApiError;
use crate::state::AppState;

static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Extracts the client IP from the request.
///
/// `X-Forwarded-For` is only honoured when the deployment says a proxy
/// rewrites it; otherwise any caller could pick its own bucket.
fn client_ip(req: &Request, trust_forwarded_for: bool) -> Option<IpAddr> {
    if trust_forwarded_for
        && let Some(xff) = req.headers().get("x-forwarded-for")
        && let Ok(s) = xff.to_str()
        && let Some(first) = s.split(',').next()
        && let Ok(ip) = first.trim().parse::<IpAddr>()
    {
        return Some(ip);
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
}

/// Runs every request through the admission gate.
///
/// Banned clients and exhausted windows get 429 before the handler runs. A
/// 5xx from the handler is charged to the client; when that charge triggers
/// a ban, the ban notice replaces the handler's response.
pub async fn admission_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(ip) = client_ip(&req, state.trust_forwarded_for()) else {
        tracing::debug!("no client address, skipping admission");
        return Ok(next.run(req).await);
    };
    let client = ip.to_string();
    let path = req.uri().path().to_owned();
    let gate = state.gate();

    let verdict = gate.admit(&path, &client).await?;

    let mut response = next.run(req).await;
    let outcome = Outcome::from_status(response.status().as_u16());
    gate.settle(&client, outcome).await?;

    if let WindowVerdict::Admitted { limit, remaining } = verdict {
        let headers = response.headers_mut();
        headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
        headers.insert(X_RATELIMIT_REMAINING.clone(), HeaderValue::from(remaining));
    }

    Ok(response)
}
