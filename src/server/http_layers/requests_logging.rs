//! Request logging + metrics middleware.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::info;

use super::super::state::HubState;

#[derive(PartialEq, PartialOrd, Clone, Debug, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    Path,
    Headers,
}

impl Default for RequestsLoggingLevel {
    fn default() -> Self {
        Self::Path
    }
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Stamps the request metric, logs per the configured level, measures
/// duration and attaches baseline security headers to every response.
pub async fn log_requests(
    State(state): State<HubState>,
    request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let level = state.config.logging_level.clone();

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    state.metrics.track_request(&method, &path);

    if level > RequestsLoggingLevel::None {
        info!(">>> {} {}", method, path);
    }
    if level >= RequestsLoggingLevel::Headers {
        for header in request.headers() {
            info!("    {:?}: {:?}", header.0, header.1);
        }
    }

    let mut response: Response = next.run(request).await;
    apply_security_headers(&mut response);

    if level > RequestsLoggingLevel::None {
        info!(
            "<<< {} {} {} ({:?})",
            method,
            path,
            response.status(),
            start.elapsed()
        );
    }

    response
}

fn apply_security_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("no-referrer"),
    );
}
