//! Hub error taxonomy.
//!
//! Every failure the request pipeline can produce maps to exactly one HTTP
//! status. Handler failures are sanitized before they reach the client;
//! the full message stays in the server logs.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    /// Bad input from the client (malformed tool name, invalid path argument).
    #[error("{0}")]
    BadRequest(String),

    /// The named tool/resource/prompt does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request body exceeded the configured maximum.
    #[error("request body exceeds {max_bytes} bytes")]
    PayloadTooLarge { max_bytes: usize },

    /// Missing or invalid API key. The expected key is never included.
    #[error("unauthorized")]
    Unauthorized,

    /// Rate limit window exhausted.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// A tool/resource/prompt handler failed.
    #[error("handler failed: {0}")]
    Handler(String),

    /// Anything unexpected inside the hub itself.
    #[error("internal error: {0}")]
    Internal(String),
}

lazy_static! {
    // Unix-style absolute path fragments, used to scrub handler errors.
    static ref ABS_PATH: Regex = Regex::new(r"/[\w.\-]+(?:/[\w.\-]+)+").unwrap();
}

impl HubError {
    pub fn status(&self) -> StatusCode {
        match self {
            HubError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HubError::NotFound(_) => StatusCode::NOT_FOUND,
            HubError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            HubError::Unauthorized => StatusCode::UNAUTHORIZED,
            HubError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            HubError::Handler(_) | HubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            HubError::BadRequest(_) => "bad_request",
            HubError::NotFound(_) => "not_found",
            HubError::PayloadTooLarge { .. } => "payload_too_large",
            HubError::Unauthorized => "unauthorized",
            HubError::RateLimited { .. } => "rate_limited",
            HubError::Handler(_) => "handler",
            HubError::Internal(_) => "internal",
        }
    }

    /// Message safe to return to the client. Handler and internal errors
    /// have absolute filesystem paths replaced before leaving the process.
    pub fn public_message(&self) -> String {
        match self {
            HubError::Handler(msg) => format!("handler failed: {}", scrub_paths(msg)),
            HubError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Replace absolute path fragments with a placeholder.
pub fn scrub_paths(message: &str) -> String {
    ABS_PATH.replace_all(message, "<path>").into_owned()
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.kind(),
            "message": self.public_message(),
        }));

        let mut response = (status, body).into_response();
        if let HubError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::Internal(err.to_string())
    }
}
