//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for the hub endpoints.
//!
//! When API routes or request formats change, update only this file.

use std::time::Duration;

use reqwest::Response;
use serde_json::Value;

use super::constants::*;

/// HTTP test client sending the configured API key on every request
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// API key attached to requests, or None for unauthenticated clients
    api_key: Option<String>,
}

impl TestClient {
    /// Creates a client that authenticates with the test API key
    pub fn authenticated(base_url: String) -> Self {
        Self::with_key(base_url, Some(TEST_API_KEY.to_string()))
    }

    /// Creates a client that sends no credentials at all
    pub fn unauthenticated(base_url: String) -> Self {
        Self::with_key(base_url, None)
    }

    /// Creates a client with an arbitrary key (for wrong-key tests)
    pub fn with_key(base_url: String, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn get_request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    fn post_request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    pub async fn get(&self, path: &str) -> Response {
        self.get_request(path).send().await.expect("GET failed")
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Response {
        self.post_request(path)
            .json(&body)
            .send()
            .await
            .expect("POST failed")
    }

    pub async fn post_raw(&self, path: &str, body: Vec<u8>) -> Response {
        self.post_request(path)
            .body(body)
            .send()
            .await
            .expect("POST failed")
    }

    // ========================================================================
    // Public endpoints
    // ========================================================================

    pub async fn health(&self) -> Response {
        self.get("/health").await
    }

    pub async fn dashboard(&self) -> Response {
        self.get("/dashboard").await
    }

    // ========================================================================
    // Tools
    // ========================================================================

    pub async fn list_tools(&self) -> Response {
        self.get("/api/tools").await
    }

    pub async fn execute_tool(&self, name: &str, args: Value) -> Response {
        self.post_json(&format!("/api/tools/{}", name), args).await
    }

    // ========================================================================
    // Resources & prompts
    // ========================================================================

    pub async fn list_resources(&self) -> Response {
        self.get("/api/resources").await
    }

    pub async fn read_resource(&self, uri: &str) -> Response {
        self.get(&format!("/api/resources/{}", uri)).await
    }

    pub async fn list_prompts(&self) -> Response {
        self.get("/api/prompts").await
    }

    pub async fn render_prompt(&self, name: &str, args: Value) -> Response {
        self.post_json(&format!("/api/prompts/{}", name), args)
            .await
    }

    // ========================================================================
    // Observability
    // ========================================================================

    pub async fn stats(&self) -> Response {
        self.get("/api/stats").await
    }

    pub async fn metrics(&self) -> Response {
        self.get("/api/metrics").await
    }

    pub async fn metrics_prometheus(&self) -> Response {
        self.get("/api/metrics/prometheus").await
    }

    pub async fn cache_stats(&self) -> Response {
        self.get("/api/cache").await
    }

    pub async fn clear_cache(&self) -> Response {
        self.post_json("/api/cache/clear", Value::Null).await
    }

    // ========================================================================
    // Settings & notifications
    // ========================================================================

    pub async fn get_settings(&self) -> Response {
        self.get("/api/settings").await
    }

    pub async fn update_settings(&self, patch: Value) -> Response {
        self.post_json("/api/settings", patch).await
    }

    pub async fn list_notifications(&self) -> Response {
        self.get("/api/notifications").await
    }

    pub async fn add_notification(&self, body: Value) -> Response {
        self.post_json("/api/notifications", body).await
    }

    // ========================================================================
    // Export & discovery
    // ========================================================================

    pub async fn export_json(&self, kind: &str) -> Response {
        self.get(&format!("/api/export/json?type={}", kind)).await
    }

    pub async fn export_csv(&self, kind: &str) -> Response {
        self.get(&format!("/api/export/csv?type={}", kind)).await
    }

    pub async fn mcp(&self, path: &str) -> Response {
        self.get(&format!("/mcp/{}", path)).await
    }
}
