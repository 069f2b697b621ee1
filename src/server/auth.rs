//! Shared-secret authentication for protected routes.
//!
//! The credential is presented as `Authorization: Bearer <key>` or in an
//! `X-Api-Key` header. Routes opt in by taking an `ApiKey` argument; its
//! rejection is a 401 and is logged as a security event. The expected key
//! never appears in logs or responses.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::error::HubError;

use super::state::HubState;

pub const HEADER_API_KEY: &str = "x-api-key";

/// Proof that the request carried the shared secret.
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

fn extract_bearer(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(axum::http::header::AUTHORIZATION)?;
    let text = value.to_str().ok()?;
    text.strip_prefix("Bearer ")
        .or_else(|| text.strip_prefix("bearer "))
        .map(str::to_string)
}

fn extract_api_key_header(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(HEADER_API_KEY)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for ApiKey
where
    HubState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = HubError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let hub = HubState::from_ref(state);

        let presented = extract_bearer(parts).or_else(|| extract_api_key_header(parts));
        match presented {
            Some(key) if key == hub.config.api_key => Ok(ApiKey),
            Some(_) => {
                warn!(
                    security = true,
                    "Rejected request to {} with invalid API key",
                    parts.uri.path()
                );
                hub.metrics.track_error("unauthorized");
                Err(HubError::Unauthorized)
            }
            None => {
                warn!(
                    security = true,
                    "Rejected unauthenticated request to {}",
                    parts.uri.path()
                );
                hub.metrics.track_error("unauthorized");
                Err(HubError::Unauthorized)
            }
        }
    }
}
