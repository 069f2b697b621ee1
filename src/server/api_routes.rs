//! Authenticated `/api/*` route handlers.

use std::error::Error;
use std::time::Instant;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::HubError;
use crate::events::HubEvent;
use crate::paths;

use super::auth::ApiKey;
use super::state::HubState;

lazy_static! {
    static ref TOOL_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").unwrap();
}

const STATS_CACHE_KEY: &str = "overview";

/// Reads at most `max_bytes` of the request body. Only the length limit
/// maps to `PayloadTooLarge`; a client aborting mid-upload is a plain bad
/// request, not a 413.
async fn read_body_limited(body: Body, max_bytes: usize) -> Result<Bytes, HubError> {
    to_bytes(body, max_bytes).await.map_err(|err| {
        let mut source: Option<&(dyn Error + 'static)> = Some(&err);
        while let Some(inner) = source {
            if inner.is::<http_body_util::LengthLimitError>() {
                return HubError::PayloadTooLarge { max_bytes };
            }
            source = inner.source();
        }
        HubError::BadRequest("failed to read request body".to_string())
    })
}

pub async fn get_stats(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    if let Some(hit) = state.stats_cache.get(STATS_CACHE_KEY) {
        return Json(hit);
    }

    let metrics = state.metrics.snapshot();
    let overview = json!({
        "project": state.config.project_name,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "registry": state.registry.stats(),
        "caches": [state.tool_cache.stats(), state.stats_cache.stats()],
        "rate_limiter": { "tracked_clients": state.rate_limiter.tracked_clients() },
        "subscribers": state.broadcaster.subscriber_count().await,
        "metrics": metrics,
    });
    state.stats_cache.set(STATS_CACHE_KEY, overview.clone());
    Json(overview)
}

pub async fn list_tools(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    Json(json!({ "tools": state.registry.all_tools() }))
}

/// Tool dispatch. Stages: name validation, registry lookup, bounded body
/// read, JSON parse (invalid degrades to `{}`), path argument sanitization,
/// cache check, execution with timing, metrics and SSE fan-out.
pub async fn execute_tool(
    _key: ApiKey,
    State(state): State<HubState>,
    Path(name): Path<String>,
    request: Request<Body>,
) -> Result<Json<Value>, HubError> {
    if !TOOL_NAME.is_match(&name) {
        state.metrics.track_error("bad_request");
        return Err(HubError::BadRequest(format!(
            "invalid tool name: {:?}",
            name
        )));
    }

    let tool = match state.registry.tool(&name) {
        Some(tool) => tool,
        None => {
            state.metrics.track_error("not_found");
            return Err(HubError::NotFound(format!("tool {}", name)));
        }
    };
    let path_args = tool.path_args.clone();
    let handler = tool.handler.clone();

    let max_bytes = state.config.max_body_bytes;
    let bytes = read_body_limited(request.into_body(), max_bytes)
        .await
        .map_err(|err| {
            state.metrics.track_error(err.kind());
            err
        })?;
    let args: Value = serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({}));

    paths::sanitize_args(&state.config.workspace_root, &path_args, &args).map_err(|err| {
        warn!(security = true, "Rejected path argument for {}: {}", name, err);
        state.metrics.track_error("bad_request");
        err
    })?;

    let cache_key = format!("{}:{}", name, args);
    if let Some(hit) = state.tool_cache.get(&cache_key) {
        state
            .broadcaster
            .broadcast(HubEvent::ToolExecuted {
                tool: name.clone(),
                duration_ms: 0,
                success: true,
                cached: true,
            })
            .await;
        return Ok(Json(json!({
            "tool": name,
            "cached": true,
            "duration_ms": 0,
            "result": hit,
        })));
    }

    let start = Instant::now();
    let outcome = handler(state.tool_context(), args).await;
    let duration = start.elapsed();
    let duration_ms = duration.as_millis() as u64;

    match outcome {
        Ok(result) => {
            state.tool_cache.set(cache_key, result.clone());
            state.metrics.track_tool_execution(&name, true, duration);
            state
                .broadcaster
                .broadcast(HubEvent::ToolExecuted {
                    tool: name.clone(),
                    duration_ms,
                    success: true,
                    cached: false,
                })
                .await;
            Ok(Json(json!({
                "tool": name,
                "cached": false,
                "duration_ms": duration_ms,
                "result": result,
            })))
        }
        Err(err) => {
            state.metrics.track_tool_execution(&name, false, duration);
            state.metrics.track_error(err.kind());
            state
                .broadcaster
                .broadcast(HubEvent::ToolExecuted {
                    tool: name.clone(),
                    duration_ms,
                    success: false,
                    cached: false,
                })
                .await;
            Err(err)
        }
    }
}

pub async fn list_resources(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    Json(json!({ "resources": state.registry.all_resources() }))
}

pub async fn read_resource(
    _key: ApiKey,
    State(state): State<HubState>,
    Path(uri): Path<String>,
) -> Result<Json<Value>, HubError> {
    let resource = match state.registry.resource(&uri) {
        Some(resource) => resource,
        None => {
            state.metrics.track_error("not_found");
            return Err(HubError::NotFound(format!("resource {}", uri)));
        }
    };
    let handler = resource.handler.clone();

    let content = handler(state.tool_context()).await.map_err(|err| {
        state.metrics.track_error(err.kind());
        err
    })?;
    Ok(Json(json!({ "contents": [content] })))
}

pub async fn list_prompts(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    Json(json!({ "prompts": state.registry.all_prompts() }))
}

pub async fn render_prompt(
    _key: ApiKey,
    State(state): State<HubState>,
    Path(name): Path<String>,
    request: Request<Body>,
) -> Result<Json<Value>, HubError> {
    let prompt = match state.registry.prompt(&name) {
        Some(prompt) => prompt,
        None => {
            state.metrics.track_error("not_found");
            return Err(HubError::NotFound(format!("prompt {}", name)));
        }
    };
    let handler = prompt.handler.clone();

    let max_bytes = state.config.max_body_bytes;
    let bytes = read_body_limited(request.into_body(), max_bytes)
        .await
        .map_err(|err| {
            state.metrics.track_error(err.kind());
            err
        })?;
    let args: Value = serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({}));

    let rendered = handler(state.tool_context(), args).await.map_err(|err| {
        state.metrics.track_error(err.kind());
        err
    })?;
    Ok(Json(json!({ "prompt": name, "rendered": rendered })))
}

pub async fn get_metrics(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    match serde_json::to_value(state.metrics.snapshot()) {
        Ok(snapshot) => Json(snapshot),
        Err(_) => Json(json!({})),
    }
}

pub async fn get_metrics_prometheus(_key: ApiKey, State(state): State<HubState>) -> Response {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        state.metrics.to_prometheus(),
    )
        .into_response()
}

pub async fn get_cache(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    Json(json!({
        "caches": [state.tool_cache.stats(), state.stats_cache.stats()],
    }))
}

pub async fn post_cache_clear(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    let mut cleared = Vec::new();
    for cache in [&state.tool_cache, &state.stats_cache] {
        cache.clear();
        cleared.push(cache.name().to_string());
        state
            .broadcaster
            .broadcast(HubEvent::CacheCleared {
                cache: cache.name().to_string(),
            })
            .await;
    }
    Json(json!({ "cleared": cleared }))
}

pub async fn get_notifications(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    Json(json!({ "notifications": state.notifications.list() }))
}

#[derive(Deserialize, Debug)]
pub struct AddNotificationBody {
    #[serde(default = "default_level")]
    pub level: String,
    pub message: String,
}

fn default_level() -> String {
    "info".to_string()
}

pub async fn post_notification(
    _key: ApiKey,
    State(state): State<HubState>,
    Json(body): Json<AddNotificationBody>,
) -> Result<impl IntoResponse, HubError> {
    let created = state.notifications.add(&body.level, &body.message)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_settings(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    Json(state.settings.get())
}

pub async fn post_settings(
    _key: ApiKey,
    State(state): State<HubState>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, HubError> {
    if !patch.is_object() {
        state.metrics.track_error("bad_request");
        return Err(HubError::BadRequest(
            "settings patch must be a JSON object".to_string(),
        ));
    }
    let merged = state.settings.update(patch)?;
    Ok(Json(merged))
}

// ============================================================================
// Export
// ============================================================================

#[derive(Deserialize, Debug)]
pub struct ExportQuery {
    #[serde(rename = "type")]
    pub kind: String,
}

fn export_payload(state: &HubState, kind: &str) -> Result<Value, HubError> {
    match kind {
        "tools" => Ok(json!(state.registry.all_tools())),
        "metrics" => serde_json::to_value(state.metrics.snapshot()).map_err(HubError::from),
        "notifications" => Ok(json!(state.notifications.list())),
        "stats" => Ok(json!({
            "project": state.config.project_name,
            "uptime_secs": state.start_time.elapsed().as_secs(),
            "registry": state.registry.stats(),
            "caches": [state.tool_cache.stats(), state.stats_cache.stats()],
        })),
        other => {
            state.metrics.track_error("bad_request");
            Err(HubError::BadRequest(format!(
                "unknown export type: {:?}",
                other
            )))
        }
    }
}

fn attachment_response(filename: &str, content_type: &'static str, body: String) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", filename);
    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static(content_type))],
        body,
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

pub async fn export_json(
    _key: ApiKey,
    State(state): State<HubState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, HubError> {
    let payload = export_payload(&state, &query.kind)?;
    let body = serde_json::to_string_pretty(&payload)?;
    Ok(attachment_response(
        &format!("toolhub-{}.json", query.kind),
        "application/json",
        body,
    ))
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn export_csv_body(state: &HubState, kind: &str) -> Result<String, HubError> {
    let mut lines = Vec::new();
    match kind {
        "tools" => {
            lines.push("name,description,category,tags".to_string());
            for tool in state.registry.all_tools() {
                lines.push(format!(
                    "{},{},{},{}",
                    csv_escape(&tool.name),
                    csv_escape(&tool.description),
                    csv_escape(tool.category.as_deref().unwrap_or("")),
                    csv_escape(&tool.tags.join(";")),
                ));
            }
        }
        "metrics" => {
            let snapshot = state.metrics.snapshot();
            lines.push("tool,success,failure".to_string());
            for (tool, stats) in &snapshot.tool_executions {
                lines.push(format!(
                    "{},{},{}",
                    csv_escape(tool),
                    stats.success,
                    stats.failure,
                ));
            }
        }
        "notifications" => {
            lines.push("id,level,message,created_at".to_string());
            for n in state.notifications.list() {
                lines.push(format!(
                    "{},{},{},{}",
                    n.id,
                    csv_escape(&n.level),
                    csv_escape(&n.message),
                    n.created_at,
                ));
            }
        }
        "stats" => {
            lines.push("cache,size,hits,misses,hit_rate".to_string());
            for stats in [state.tool_cache.stats(), state.stats_cache.stats()] {
                lines.push(format!(
                    "{},{},{},{},{:.3}",
                    stats.name, stats.size, stats.hits, stats.misses, stats.hit_rate,
                ));
            }
        }
        other => {
            state.metrics.track_error("bad_request");
            return Err(HubError::BadRequest(format!(
                "unknown export type: {:?}",
                other
            )));
        }
    }
    lines.push(String::new());
    Ok(lines.join("\n"))
}

pub async fn export_csv(
    _key: ApiKey,
    State(state): State<HubState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, HubError> {
    let body = export_csv_body(&state, &query.kind)?;
    Ok(attachment_response(
        &format!("toolhub-{}.csv", query.kind),
        "text/csv",
        body,
    ))
}
