use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::HubConfig;
use crate::events::HubEvent;
use crate::registry::PluginRegistry;

use super::api_routes::*;
use super::dashboard::dashboard;
use super::http_layers::{enforce_rate_limit, log_requests};
#[cfg(feature = "slowdown")]
use super::http_layers::slowdown_request;
use super::mcp_routes;
use super::state::{GuardedBroadcaster, HubState};

/// Interval of the background pass that evicts expired cache entries and
/// stale rate-limit windows.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

async fn health(State(state): State<HubState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "project": state.config.project_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// ============================================================================
// SSE
// ============================================================================

/// Drops trigger unsubscription, so a closed browser tab frees its slot
/// without waiting for the next failed broadcast.
struct SubscriberGuard {
    id: u64,
    broadcaster: GuardedBroadcaster,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        let broadcaster = self.broadcaster.clone();
        let id = self.id;
        tokio::spawn(async move {
            broadcaster.unsubscribe(id).await;
        });
    }
}

struct EventStream {
    receiver: mpsc::Receiver<HubEvent>,
    _guard: SubscriberGuard,
}

async fn events(
    State(state): State<HubState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, receiver) = state.broadcaster.subscribe().await;
    let guard = SubscriberGuard {
        id,
        broadcaster: state.broadcaster.clone(),
    };

    let stream = stream::unfold(
        EventStream {
            receiver,
            _guard: guard,
        },
        |mut s| async move {
            let event = s.receiver.recv().await?;
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            Some((Ok(Event::default().data(data)), s))
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ============================================================================
// CORS preflight
// ============================================================================

/// Answers `OPTIONS` with an empty 204 before any other stage runs; actual
/// responses get their CORS headers from the `CorsLayer` beneath this.
async fn preflight(request: Request<axum::body::Body>, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
        headers.insert(
            "access-control-allow-methods",
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            "access-control-allow-headers",
            HeaderValue::from_static("authorization, content-type, x-api-key"),
        );
        return response;
    }
    next.run(request).await
}

// ============================================================================
// App assembly
// ============================================================================

pub fn make_app(state: HubState) -> Router {
    let api_routes: Router = Router::new()
        .route("/stats", get(get_stats))
        .route("/tools", get(list_tools))
        .route("/tools/{name}", post(execute_tool))
        .route("/resources", get(list_resources))
        .route("/resources/{*uri}", get(read_resource))
        .route("/prompts", get(list_prompts))
        .route("/prompts/{name}", post(render_prompt))
        .route("/metrics", get(get_metrics))
        .route("/metrics/prometheus", get(get_metrics_prometheus))
        .route("/cache", get(get_cache))
        .route("/cache/clear", post(post_cache_clear))
        .route(
            "/notifications",
            get(get_notifications).post(post_notification),
        )
        .route("/settings", get(get_settings).post(post_settings))
        .route("/export/json", get(export_json))
        .route("/export/csv", get(export_csv))
        .with_state(state.clone());

    let discovery_routes: Router = Router::new()
        .route("/capabilities", get(mcp_routes::capabilities))
        .route("/tools/list", get(mcp_routes::tools_list))
        .route("/resources/list", get(mcp_routes::resources_list))
        .route("/prompts/list", get(mcp_routes::prompts_list))
        .with_state(state.clone());

    let public_routes: Router = Router::new()
        .route("/", get(dashboard))
        .route("/dashboard", get(dashboard))
        .route("/health", get(health))
        .route("/events", get(events))
        .with_state(state.clone());

    let mut app: Router = public_routes
        .nest("/api", api_routes)
        .nest("/mcp", discovery_routes);

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }

    app = app
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_rate_limit,
        ))
        .layer(middleware::from_fn_with_state(state, log_requests))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(preflight));

    app
}

async fn sweep_loop(state: HubState) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let evicted = state.tool_cache.sweep() + state.stats_cache.sweep();
        let dropped = state.rate_limiter.sweep();
        if evicted > 0 || dropped > 0 {
            info!(
                "Sweep evicted {} cache entries, {} idle rate-limit windows",
                evicted, dropped
            );
        }
    }
}

async fn shutdown_signal(state: HubState) {
    let grace = state.config.shutdown_grace;
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!("Failed to install SIGTERM handler: {}", err),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
    // Open event streams would otherwise never complete and keep the
    // drain phase alive until the forced exit below.
    state.broadcaster.close_all().await;
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        error!("Graceful shutdown timed out after {:?}, forcing exit", grace);
        std::process::exit(1);
    });
}

pub async fn run_server(config: HubConfig, registry: PluginRegistry) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    let state = HubState::new(config, registry);
    let app = make_app(state.clone());

    tokio::spawn(sweep_loop(state.clone()));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(state))
    .await?;

    info!("Shut down cleanly");
    Ok(())
}
