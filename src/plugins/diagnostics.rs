//! Diagnostics plugin: hub introspection tools, the hub config resource and
//! a project summary prompt.

use std::time::Duration;

use serde_json::{json, Value};

use crate::error::HubError;
use crate::registry::{
    PluginRegistry, PromptBuilder, ResourceBuilder, ResourceContent, ToolBuilder, ToolContext,
};

use super::process::run_command;
use super::Plugin;

/// Timeout for any external command launched by this plugin.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

pub struct DiagnosticsPlugin;

impl Plugin for DiagnosticsPlugin {
    fn name(&self) -> &str {
        "diagnostics"
    }

    fn register(&self, registry: &mut PluginRegistry) -> anyhow::Result<()> {
        registry.register_tool(
            ToolBuilder::new("hub_info")
                .description("Report hub uptime, project and version")
                .category("diagnostics")
                .build(hub_info),
        );

        registry.register_tool(
            ToolBuilder::new("git_status")
                .description("Run `git status --short` in the workspace")
                .category("diagnostics")
                .tag("git")
                .build(git_status),
        );

        registry.register_resource(
            ResourceBuilder::new("config://hub", "Hub configuration")
                .description("Workspace root and project identity as the hub sees them")
                .mime_type("application/json")
                .build(hub_config_resource),
        );

        registry.register_prompt(
            PromptBuilder::new("project_summary")
                .description("Prompt asking an agent to summarize the project workspace")
                .argument("focus", "Aspect of the project to emphasize", false)
                .build(project_summary),
        );

        Ok(())
    }
}

async fn hub_info(ctx: ToolContext, _args: Value) -> Result<Value, HubError> {
    Ok(json!({
        "project": ctx.project_name,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": ctx.start_time.elapsed().as_secs(),
        "workspace_root": ctx.workspace_root.to_string_lossy(),
    }))
}

async fn git_status(ctx: ToolContext, _args: Value) -> Result<Value, HubError> {
    let output = run_command(
        "git",
        &["status", "--short"],
        &ctx.workspace_root,
        COMMAND_TIMEOUT,
    )
    .await?;
    Ok(serde_json::to_value(output)?)
}

async fn hub_config_resource(ctx: ToolContext) -> Result<ResourceContent, HubError> {
    let body = json!({
        "project": ctx.project_name,
        "workspaceRoot": ctx.workspace_root.to_string_lossy(),
        "version": env!("CARGO_PKG_VERSION"),
    });
    Ok(ResourceContent {
        uri: "config://hub".to_string(),
        mime_type: Some("application/json".to_string()),
        text: serde_json::to_string_pretty(&body)?,
    })
}

async fn project_summary(ctx: ToolContext, args: Value) -> Result<Value, HubError> {
    let focus = args
        .get("focus")
        .and_then(Value::as_str)
        .unwrap_or("overall structure");
    Ok(json!({
        "description": format!("Summarize the '{}' project", ctx.project_name),
        "messages": [{
            "role": "user",
            "content": format!(
                "Inspect the workspace of project '{}' and summarize its {}. \
                 Use the list_files and read_file tools to explore.",
                ctx.project_name, focus
            ),
        }],
    }))
}
