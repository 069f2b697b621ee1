//! MCP discovery surface.
//!
//! Read-only mirrors of the registry catalogs, shaped like MCP
//! initialize/list results so MCP-aware clients can discover what the hub
//! offers without speaking the full protocol.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::auth::ApiKey;
use super::state::HubState;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub async fn capabilities(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    Json(json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": state.config.project_name,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {
            "tools": { "listChanged": false },
            "resources": { "subscribe": false, "listChanged": false },
            "prompts": { "listChanged": false },
        },
    }))
}

pub async fn tools_list(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    Json(json!({ "tools": state.registry.all_tools() }))
}

pub async fn resources_list(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    Json(json!({ "resources": state.registry.all_resources() }))
}

pub async fn prompts_list(_key: ApiKey, State(state): State<HubState>) -> Json<Value> {
    Json(json!({ "prompts": state.registry.all_prompts() }))
}
