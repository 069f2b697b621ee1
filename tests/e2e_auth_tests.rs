//! End-to-end tests for the authentication layer
//!
//! Public routes must work without credentials; /api and /mcp must reject
//! missing or wrong keys and never leak the expected one.

mod common;

use common::{TestClient, TestServer, TEST_API_KEY, TEST_PROJECT, WRONG_API_KEY};
use reqwest::StatusCode;

#[tokio::test]
async fn test_health_is_public() {
    let server = TestServer::spawn().await;
    let client = TestClient::unauthenticated(server.base_url.clone());

    let response = client.health().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["project"], TEST_PROJECT);
}

#[tokio::test]
async fn test_dashboard_is_public() {
    let server = TestServer::spawn().await;
    let client = TestClient::unauthenticated(server.base_url.clone());

    let response = client.dashboard().await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = response.text().await.unwrap();
    assert!(html.contains(TEST_PROJECT));
}

#[tokio::test]
async fn test_api_rejects_missing_key() {
    let server = TestServer::spawn().await;
    let client = TestClient::unauthenticated(server.base_url.clone());

    let response = client.list_tools().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_rejects_wrong_key() {
    let server = TestServer::spawn().await;
    let client = TestClient::with_key(server.base_url.clone(), Some(WRONG_API_KEY.to_string()));

    let response = client.list_tools().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mcp_rejects_missing_key() {
    let server = TestServer::spawn().await;
    let client = TestClient::unauthenticated(server.base_url.clone());

    let response = client.mcp("capabilities").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_accepts_bearer_key() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());

    let response = client.list_tools().await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_accepts_header_key() {
    let server = TestServer::spawn().await;
    let client = TestClient::unauthenticated(server.base_url.clone());

    let response = client
        .client
        .get(format!("{}/api/tools", server.base_url))
        .header("x-api-key", TEST_API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unauthorized_body_never_echoes_key() {
    let server = TestServer::spawn().await;
    let client = TestClient::with_key(server.base_url.clone(), Some(WRONG_API_KEY.to_string()));

    let response = client.list_tools().await;
    let text = response.text().await.unwrap();
    assert!(!text.contains(TEST_API_KEY));
}

#[tokio::test]
async fn test_preflight_is_open() {
    let server = TestServer::spawn().await;
    let client = TestClient::unauthenticated(server.base_url.clone());

    let response = client
        .client
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/api/tools", server.base_url),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}
