//! Per-client rate limiting middleware.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::HubError;

use super::super::state::HubState;

/// Applies the fixed-window limiter to the connecting client address
/// before any routing or auth work happens. Allowed requests get the
/// usual X-RateLimit-* headers, rejected ones a 429 with Retry-After.
pub async fn enforce_rate_limit(
    State(state): State<HubState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    let decision = state.rate_limiter.check(ip);

    if !decision.allowed {
        warn!("Rate limit exceeded for {}", ip);
        state.metrics.track_rate_limited(&ip.to_string());
        state.metrics.track_error("rate_limited");
        return HubError::RateLimited {
            retry_after_secs: decision.reset_in_secs,
        }
        .into_response();
    }

    let mut response = next.run(request).await;
    if decision.limit != u32::MAX {
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&decision.limit.to_string()) {
            headers.insert("x-ratelimit-limit", value);
        }
        if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
            headers.insert("x-ratelimit-remaining", value);
        }
        if let Ok(value) = HeaderValue::from_str(&decision.reset_in_secs.to_string()) {
            headers.insert("x-ratelimit-reset", value);
        }
    }
    response
}

/// Resolves the client address from connection info. In-process routers
/// built without connect info fall back to loopback.
fn client_ip(request: &Request<Body>) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
