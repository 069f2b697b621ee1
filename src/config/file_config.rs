//! Optional TOML configuration file.
//!
//! Every field is optional; values present in the file override CLI/env
//! values during `HubConfig::resolve`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub workspace_root: Option<String>,
    pub api_key: Option<String>,
    pub project_name: Option<String>,
    pub logging_level: Option<String>,
    pub rate_limit_max_requests: Option<u32>,
    pub rate_limit_window_secs: Option<u64>,
    pub tool_cache_ttl_secs: Option<u64>,
    pub stats_cache_ttl_secs: Option<u64>,
    pub max_body_bytes: Option<usize>,
    pub shutdown_grace_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {:?}", path))
    }
}
