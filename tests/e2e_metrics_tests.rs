//! End-to-end tests for stats, metrics and cache endpoints

mod common;

use common::{TestClient, TestServer, TEST_PROJECT};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_stats_overview() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());

    let response = client.stats().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["project"], TEST_PROJECT);
    assert!(body["registry"]["tools"].as_u64().unwrap() >= 2);
    assert!(body["caches"].as_array().unwrap().len() == 2);
}

#[tokio::test]
async fn test_metrics_snapshot_counts_requests_and_executions() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());

    client.execute_tool("echo_test", json!({ "n": 1 })).await;
    client.execute_tool("echo_test", json!({ "n": 2 })).await;

    let body: Value = client.metrics().await.json().await.unwrap();
    assert!(body["requests_total"].as_u64().unwrap() >= 2);
    assert_eq!(body["tool_executions"]["echo_test"]["success"], 2);
    assert_eq!(body["tool_executions"]["echo_test"]["failure"], 0);
}

#[tokio::test]
async fn test_prometheus_exposition_contains_counter_families() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());

    client.execute_tool("echo_test", json!({})).await;

    let response = client.metrics_prometheus().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let text = response.text().await.unwrap();
    assert!(text.contains("toolhub_http_requests_total"));
    assert!(text.contains("toolhub_tool_executions_total"));
    assert!(text.contains("toolhub_tool_duration_seconds"));
}

#[tokio::test]
async fn test_cache_stats_reflect_usage() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());

    client.execute_tool("echo_test", json!({ "k": 1 })).await;
    client.execute_tool("echo_test", json!({ "k": 1 })).await;

    let body: Value = client.cache_stats().await.json().await.unwrap();
    let tool_cache = body["caches"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "tool_results")
        .unwrap()
        .clone();
    assert_eq!(tool_cache["size"], 1);
    assert!(tool_cache["hits"].as_u64().unwrap() >= 1);
    assert!(tool_cache["misses"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_cache_clear_empties_caches() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());

    client.execute_tool("echo_test", json!({ "k": 1 })).await;

    let response = client.clear_cache().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let cleared = body["cleared"].as_array().unwrap();
    assert!(cleared.contains(&json!("tool_results")));

    let stats: Value = client.cache_stats().await.json().await.unwrap();
    let tool_cache = stats["caches"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "tool_results")
        .unwrap()
        .clone();
    assert_eq!(tool_cache["size"], 0);

    // The next identical call misses again.
    let next: Value = client
        .execute_tool("echo_test", json!({ "k": 1 }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(next["cached"], false);
}

#[tokio::test]
async fn test_failed_execution_counts_as_failure() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone());

    // read_file with a missing file fails inside the handler.
    let response = client
        .execute_tool("read_file", json!({ "path": "missing.txt" }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = client.metrics().await.json().await.unwrap();
    assert_eq!(body["tool_executions"]["read_file"]["failure"], 1);
}
