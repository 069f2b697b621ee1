//! Dev-only latency injection, enabled with the `slowdown` feature.

use std::time::Duration;

use axum::{body::Body, http::Request, middleware::Next, response::Response};

const SLOWDOWN_MS: u64 = 250;

pub async fn slowdown_request(request: Request<Body>, next: Next) -> Response {
    tokio::time::sleep(Duration::from_millis(SLOWDOWN_MS)).await;
    next.run(request).await
}
