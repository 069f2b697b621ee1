//! Workspace plugin: file listing, reading and text search confined to the
//! configured workspace root.

use std::path::PathBuf;
use std::sync::Arc;

use futures::{stream, StreamExt};
use serde_json::{json, Value};
use walkdir::WalkDir;

use crate::error::HubError;
use crate::paths;
use crate::registry::{PluginRegistry, ToolBuilder, ToolContext};

use super::Plugin;

/// Upper bound on directory entries returned by a single listing.
const MAX_LIST_ENTRIES: usize = 500;
/// Upper bound on file bytes returned by a single read.
const MAX_READ_BYTES: u64 = 256 * 1024;
/// Files larger than this are skipped during search.
const MAX_SEARCH_FILE_BYTES: u64 = 512 * 1024;
/// Parallel file reads in flight during search.
const SEARCH_READ_BATCH: usize = 8;

pub struct WorkspacePlugin;

impl Plugin for WorkspacePlugin {
    fn name(&self) -> &str {
        "workspace"
    }

    fn register(&self, registry: &mut PluginRegistry) -> anyhow::Result<()> {
        registry.register_tool(
            ToolBuilder::new("list_files")
                .description("List files under a workspace directory")
                .category("workspace")
                .tag("filesystem")
                .path_arg("path")
                .input_schema(json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "Directory relative to the workspace root" },
                        "max_depth": { "type": "integer", "default": 4 }
                    }
                }))
                .build(list_files),
        );

        registry.register_tool(
            ToolBuilder::new("read_file")
                .description("Read a text file from the workspace")
                .category("workspace")
                .tag("filesystem")
                .path_arg("path")
                .input_schema(json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "File relative to the workspace root" }
                    },
                    "required": ["path"]
                }))
                .build(read_file),
        );

        registry.register_tool(
            ToolBuilder::new("search_text")
                .description("Search workspace files for a text fragment")
                .category("workspace")
                .tag("filesystem")
                .tag("search")
                .path_arg("path")
                .input_schema(json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "path": { "type": "string", "description": "Directory to search, relative to the workspace root" },
                        "max_results": { "type": "integer", "default": 50 }
                    },
                    "required": ["query"]
                }))
                .build(search_text),
        );

        Ok(())
    }
}

fn arg_str(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_string)
}

async fn list_files(ctx: ToolContext, args: Value) -> Result<Value, HubError> {
    let rel = arg_str(&args, "path").unwrap_or_default();
    let max_depth = args
        .get("max_depth")
        .and_then(Value::as_u64)
        .unwrap_or(4)
        .min(16) as usize;

    let root = paths::resolve(&ctx.workspace_root, &rel)?;
    let workspace_root = ctx.workspace_root.clone();

    // walkdir is synchronous; keep it off the request executor.
    let entries = tokio::task::spawn_blocking(move || {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&root)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(Result::ok)
            .take(MAX_LIST_ENTRIES)
        {
            let path = entry
                .path()
                .strip_prefix(&workspace_root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .into_owned();
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(json!({
                "path": path,
                "is_dir": entry.file_type().is_dir(),
                "size": size,
            }));
        }
        entries
    })
    .await
    .map_err(|e| HubError::Internal(e.to_string()))?;

    let truncated = entries.len() >= MAX_LIST_ENTRIES;
    Ok(json!({
        "entries": entries,
        "truncated": truncated,
    }))
}

async fn read_file(ctx: ToolContext, args: Value) -> Result<Value, HubError> {
    let rel = arg_str(&args, "path")
        .ok_or_else(|| HubError::BadRequest("missing required argument 'path'".into()))?;
    let path = paths::resolve(&ctx.workspace_root, &rel)?;

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|_| HubError::NotFound(format!("file: {rel}")))?;
    if !metadata.is_file() {
        return Err(HubError::BadRequest(format!("not a file: {rel}")));
    }
    if metadata.len() > MAX_READ_BYTES {
        return Err(HubError::BadRequest(format!(
            "file larger than {MAX_READ_BYTES} bytes: {rel}"
        )));
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| HubError::Handler(e.to_string()))?;

    Ok(json!({
        "path": rel,
        "size": metadata.len(),
        "content": String::from_utf8_lossy(&bytes),
    }))
}

async fn search_text(ctx: ToolContext, args: Value) -> Result<Value, HubError> {
    let query = arg_str(&args, "query")
        .ok_or_else(|| HubError::BadRequest("missing required argument 'query'".into()))?;
    if query.is_empty() {
        return Err(HubError::BadRequest("query must not be empty".into()));
    }
    let rel = arg_str(&args, "path").unwrap_or_default();
    let max_results = args
        .get("max_results")
        .and_then(Value::as_u64)
        .unwrap_or(50)
        .min(500) as usize;

    let root = paths::resolve(&ctx.workspace_root, &rel)?;
    let workspace_root = Arc::new(ctx.workspace_root.clone());

    let candidates: Vec<PathBuf> = tokio::task::spawn_blocking(move || {
        WalkDir::new(&root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.metadata().map(|m| m.len() <= MAX_SEARCH_FILE_BYTES).unwrap_or(false))
            .map(|e| e.into_path())
            .take(2000)
            .collect()
    })
    .await
    .map_err(|e| HubError::Internal(e.to_string()))?;

    // Read candidates in bounded parallel batches so a big tree neither
    // serializes nor opens an unbounded number of files at once.
    let query = Arc::new(query);
    let matches: Vec<Value> = stream::iter(candidates)
        .map(|path| {
            let query = query.clone();
            let workspace_root = workspace_root.clone();
            async move {
                let bytes = tokio::fs::read(&path).await.ok()?;
                let text = String::from_utf8(bytes).ok()?;
                let rel = path
                    .strip_prefix(workspace_root.as_path())
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .into_owned();
                let hits: Vec<Value> = text
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.contains(query.as_str()))
                    .take(20)
                    .map(|(n, line)| json!({ "line": n + 1, "text": line.trim_end() }))
                    .collect();
                if hits.is_empty() {
                    None
                } else {
                    Some(json!({ "path": rel, "matches": hits }))
                }
            }
        })
        .buffer_unordered(SEARCH_READ_BATCH)
        .filter_map(|m| async move { m })
        .take(max_results)
        .collect()
        .await;

    Ok(json!({ "query": query.as_str(), "files": matches }))
}
