//! Tool, resource and prompt registry.
//!
//! Plugins populate one shared `PluginRegistry` at startup; after loading
//! completes the registry is read-only and shared behind an `Arc`. Lookups
//! are O(1); listing preserves first-registration order. Registering a key
//! twice silently replaces the prior definition, so registration order
//! across plugins matters.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::error::HubError;

// ============================================================================
// Handler context
// ============================================================================

/// Context provided to tool, resource and prompt handlers during execution.
#[derive(Clone)]
pub struct ToolContext {
    /// Root directory all path arguments are confined to.
    pub workspace_root: PathBuf,
    /// Display name of the project this hub serves.
    pub project_name: String,
    /// Hub start time, for uptime reporting.
    pub start_time: Instant,
}

// ============================================================================
// Tool types
// ============================================================================

pub type ToolResult = Result<Value, HubError>;
pub type ToolHandler = Arc<dyn Fn(ToolContext, Value) -> BoxFuture<'static, ToolResult> + Send + Sync>;

/// A registered tool with metadata and handler.
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub category: Option<String>,
    pub tags: Vec<String>,
    /// Argument names the pipeline must sanitize as workspace paths before
    /// the handler ever sees them.
    pub path_args: Vec<String>,
    pub handler: ToolHandler,
}

/// Catalog entry shape shared by `/api/tools` and `/mcp/tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

// ============================================================================
// Resource types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub text: String,
}

pub type ResourceResult = Result<ResourceContent, HubError>;
pub type ResourceHandler = Arc<dyn Fn(ToolContext) -> BoxFuture<'static, ResourceResult> + Send + Sync>;

pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub handler: ResourceHandler,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceDefinition {
    pub fn info(&self) -> ResourceInfo {
        ResourceInfo {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

// ============================================================================
// Prompt types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

pub type PromptResult = Result<Value, HubError>;
pub type PromptHandler = Arc<dyn Fn(ToolContext, Value) -> BoxFuture<'static, PromptResult> + Send + Sync>;

pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
    pub handler: PromptHandler,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptInfo {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

impl PromptDefinition {
    pub fn info(&self) -> PromptInfo {
        PromptInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub tools: usize,
    pub resources: usize,
    pub prompts: usize,
}

/// Keyed store that preserves first-registration order for listing.
struct OrderedMap<T> {
    entries: HashMap<String, T>,
    order: Vec<String>,
}

impl<T> OrderedMap<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn insert(&mut self, key: String, value: T) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push(key);
        }
    }

    fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    fn values(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|k| self.entries.get(k))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct PluginRegistry {
    tools: OrderedMap<ToolDefinition>,
    resources: OrderedMap<ResourceDefinition>,
    prompts: OrderedMap<PromptDefinition>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            tools: OrderedMap::new(),
            resources: OrderedMap::new(),
            prompts: OrderedMap::new(),
        }
    }

    pub fn register_tool(&mut self, tool: ToolDefinition) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn register_resource(&mut self, resource: ResourceDefinition) {
        self.resources.insert(resource.uri.clone(), resource);
    }

    pub fn register_prompt(&mut self, prompt: PromptDefinition) {
        self.prompts.insert(prompt.name.clone(), prompt);
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn resource(&self, uri: &str) -> Option<&ResourceDefinition> {
        self.resources.get(uri)
    }

    pub fn prompt(&self, name: &str) -> Option<&PromptDefinition> {
        self.prompts.get(name)
    }

    pub fn all_tools(&self) -> Vec<ToolInfo> {
        self.tools.values().map(ToolDefinition::info).collect()
    }

    pub fn all_resources(&self) -> Vec<ResourceInfo> {
        self.resources
            .values()
            .map(ResourceDefinition::info)
            .collect()
    }

    pub fn all_prompts(&self) -> Vec<PromptInfo> {
        self.prompts.values().map(PromptDefinition::info).collect()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            tools: self.tools.len(),
            resources: self.resources.len(),
            prompts: self.prompts.len(),
        }
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Builders
// ============================================================================

pub struct ToolBuilder {
    name: String,
    description: String,
    input_schema: Value,
    category: Option<String>,
    tags: Vec<String>,
    path_args: Vec<String>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
            category: None,
            tags: Vec::new(),
            path_args: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Declare an argument holding a workspace-relative path. The pipeline
    /// sanitizes these before dispatch.
    pub fn path_arg(mut self, arg: impl Into<String>) -> Self {
        self.path_args.push(arg.into());
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> ToolDefinition
    where
        F: Fn(ToolContext, Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ToolResult> + Send + 'static,
    {
        ToolDefinition {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema,
            category: self.category,
            tags: self.tags,
            path_args: self.path_args,
            handler: Arc::new(move |ctx, args| Box::pin(handler(ctx, args))),
        }
    }
}

pub struct ResourceBuilder {
    uri: String,
    name: String,
    description: Option<String>,
    mime_type: Option<String>,
}

impl ResourceBuilder {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> ResourceDefinition
    where
        F: Fn(ToolContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ResourceResult> + Send + 'static,
    {
        ResourceDefinition {
            uri: self.uri,
            name: self.name,
            description: self.description,
            mime_type: self.mime_type,
            handler: Arc::new(move |ctx| Box::pin(handler(ctx))),
        }
    }
}

pub struct PromptBuilder {
    name: String,
    description: String,
    arguments: Vec<PromptArgument>,
}

impl PromptBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            arguments: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn argument(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.arguments.push(PromptArgument {
            name: name.into(),
            description: description.into(),
            required,
        });
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> PromptDefinition
    where
        F: Fn(ToolContext, Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = PromptResult> + Send + 'static,
    {
        PromptDefinition {
            name: self.name,
            description: self.description,
            arguments: self.arguments,
            handler: Arc::new(move |ctx, args| Box::pin(handler(ctx, args))),
        }
    }
}
