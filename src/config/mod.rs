mod file_config;

pub use file_config::FileConfig;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::warn;

use crate::server::RequestsLoggingLevel;

/// CLI/env values gathered by the binary, before file overrides.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub host: String,
    pub port: u16,
    pub workspace_root: Option<PathBuf>,
    pub api_key: Option<String>,
    pub project_name: String,
    pub logging_level: RequestsLoggingLevel,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    pub tool_cache_ttl_secs: u64,
    pub stats_cache_ttl_secs: u64,
    pub max_body_bytes: usize,
    pub shutdown_grace_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7420,
            workspace_root: None,
            api_key: None,
            project_name: "toolhub".to_string(),
            logging_level: RequestsLoggingLevel::default(),
            rate_limit_max_requests: 100,
            rate_limit_window_secs: 60,
            tool_cache_ttl_secs: 30,
            stats_cache_ttl_secs: 300,
            max_body_bytes: 1024 * 1024,
            shutdown_grace_secs: 10,
        }
    }
}

/// Fully resolved hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub host: String,
    pub port: u16,
    pub workspace_root: PathBuf,
    pub api_key: String,
    pub project_name: String,
    pub logging_level: RequestsLoggingLevel,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
    pub tool_cache_ttl: Duration,
    pub stats_cache_ttl: Duration,
    pub max_body_bytes: usize,
    pub shutdown_grace: Duration,
}

impl HubConfig {
    /// Resolve configuration from CLI/env arguments and an optional TOML
    /// file. File values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file: Option<FileConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let workspace_root = file
            .workspace_root
            .map(PathBuf::from)
            .or_else(|| cli.workspace_root.clone())
            .map_or_else(std::env::current_dir, Ok)?;

        if !workspace_root.is_dir() {
            bail!("workspace root is not a directory: {:?}", workspace_root);
        }
        let workspace_root = workspace_root.canonicalize()?;

        let api_key = file.api_key.or_else(|| cli.api_key.clone()).unwrap_or_else(|| {
            let generated = uuid::Uuid::new_v4().to_string();
            warn!(
                "No API key configured; generated one for this run: {}",
                generated
            );
            generated
        });
        if api_key.is_empty() {
            bail!("API key must not be empty");
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        Ok(Self {
            host: file.host.unwrap_or_else(|| cli.host.clone()),
            port: file.port.unwrap_or(cli.port),
            workspace_root,
            api_key,
            project_name: file
                .project_name
                .unwrap_or_else(|| cli.project_name.clone()),
            logging_level,
            rate_limit_max_requests: file
                .rate_limit_max_requests
                .unwrap_or(cli.rate_limit_max_requests),
            rate_limit_window: Duration::from_secs(
                file.rate_limit_window_secs
                    .unwrap_or(cli.rate_limit_window_secs),
            ),
            tool_cache_ttl: Duration::from_secs(
                file.tool_cache_ttl_secs.unwrap_or(cli.tool_cache_ttl_secs),
            ),
            stats_cache_ttl: Duration::from_secs(
                file.stats_cache_ttl_secs
                    .unwrap_or(cli.stats_cache_ttl_secs),
            ),
            max_body_bytes: file.max_body_bytes.unwrap_or(cli.max_body_bytes),
            shutdown_grace: Duration::from_secs(
                file.shutdown_grace_secs.unwrap_or(cli.shutdown_grace_secs),
            ),
        })
    }

    /// Directory for persisted hub state (settings, notifications).
    pub fn data_dir(&self) -> PathBuf {
        self.workspace_root.join(".toolhub")
    }
}

fn parse_logging_level(value: &str) -> Option<RequestsLoggingLevel> {
    match value.to_lowercase().as_str() {
        "none" => Some(RequestsLoggingLevel::None),
        "path" => Some(RequestsLoggingLevel::Path),
        "headers" => Some(RequestsLoggingLevel::Headers),
        _ => {
            warn!("Unknown logging_level '{}' in config file, ignoring", value);
            None
        }
    }
}
