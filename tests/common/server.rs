//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own workspace and state.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

use toolhub::config::{CliConfig, HubConfig};
use toolhub::plugins::{builtin_plugins, load_plugins};
use toolhub::registry::{PluginRegistry, ToolBuilder};
use toolhub::server::{make_app, HubState, RequestsLoggingLevel};

use super::constants::*;
use super::fixtures::populate_workspace;

/// Test server instance with an isolated workspace
///
/// When dropped, the server gracefully shuts down and temp resources are
/// cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Times the `probe` tool handler actually ran. Lets tests assert that
    /// rejected requests never reached the handler.
    pub probe_invocations: Arc<AtomicUsize>,

    // Private fields - keep resources alive until drop
    _workspace: TempDir,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    serve_task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// The server runs the built-in plugins plus two test-only tools:
    /// `echo_test` (echoes its arguments) and `probe` (counts invocations,
    /// declares a `path` argument).
    pub async fn spawn() -> Self {
        let workspace = TempDir::new().expect("Failed to create workspace dir");
        populate_workspace(workspace.path()).expect("Failed to populate workspace");

        let cli = CliConfig {
            workspace_root: Some(workspace.path().to_path_buf()),
            api_key: Some(TEST_API_KEY.to_string()),
            project_name: TEST_PROJECT.to_string(),
            logging_level: RequestsLoggingLevel::None,
            ..CliConfig::default()
        };
        let config = HubConfig::resolve(&cli, None).expect("Failed to resolve config");

        let mut registry = PluginRegistry::new();
        let plugins = builtin_plugins();
        let report = load_plugins(&plugins, &mut registry);
        assert!(
            report.failed.is_empty(),
            "Built-in plugins failed to load: {:?}",
            report.failed
        );

        registry.register_tool(
            ToolBuilder::new("echo_test")
                .description("Echoes its message argument back")
                .input_schema(json!({
                    "type": "object",
                    "properties": { "message": { "type": "string" } }
                }))
                .build(|_ctx, args| async move {
                    let echoed = format!(
                        "Echo: {}",
                        args.get("message").and_then(|m| m.as_str()).unwrap_or("")
                    );
                    Ok(json!({ "message": echoed, "args": args }))
                }),
        );

        let probe_invocations = Arc::new(AtomicUsize::new(0));
        let counter = probe_invocations.clone();
        registry.register_tool(
            ToolBuilder::new("probe")
                .description("Counts handler invocations")
                .input_schema(json!({ "type": "object" }))
                .path_arg("path")
                .build(move |_ctx, args| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(json!({ "args": args }))
                    }
                }),
        );

        let state = HubState::new(config, registry);
        let app = make_app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        // Same shutdown sequence as the real server: the signal closes
        // open event streams so the drain phase can complete.
        let broadcaster = state.broadcaster.clone();
        let serve_task = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
                broadcaster.close_all().await;
            })
            .await
            .expect("Test server failed");
        });

        let server = Self {
            base_url,
            port,
            probe_invocations,
            _workspace: workspace,
            shutdown_tx: Some(shutdown_tx),
            serve_task,
        };
        server.wait_until_ready().await;
        server
    }

    /// Triggers graceful shutdown and waits for the serve task to finish.
    ///
    /// Panics if the server does not drain within `timeout`.
    pub async fn shutdown_within(mut self, timeout: Duration) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(timeout, self.serve_task)
            .await
            .expect("Server did not shut down within the timeout")
            .expect("Test server failed");
    }

    async fn wait_until_ready(&self) {
        let client = reqwest::Client::new();
        let url = format!("{}/health", self.base_url);
        for _ in 0..50 {
            if let Ok(response) = client.get(&url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Test server did not become ready");
    }
}
