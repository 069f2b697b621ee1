use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use toolhub::config::{CliConfig, FileConfig, HubConfig};
use toolhub::plugins::{builtin_plugins, load_plugins};
use toolhub::registry::PluginRegistry;
use toolhub::server::{run_server, RequestsLoggingLevel};

#[derive(Parser, Debug)]
#[clap(name = "toolhub", version, about = "Local tool hub for plugin-provided tools, resources and prompts")]
struct CliArgs {
    /// Address to bind on.
    #[clap(long, env = "TOOLHUB_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// The port to listen on.
    #[clap(short, long, env = "TOOLHUB_PORT", default_value_t = 7420)]
    pub port: u16,

    /// Workspace root all path arguments are confined to. Defaults to cwd.
    #[clap(long, env = "TOOLHUB_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// API key protecting /api and /mcp. Generated per run when absent.
    #[clap(long, env = "TOOLHUB_API_KEY")]
    pub api_key: Option<String>,

    /// Project display name.
    #[clap(long, env = "TOOLHUB_PROJECT", default_value = "toolhub")]
    pub project: String,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Requests allowed per client per window.
    #[clap(long, default_value_t = 100)]
    pub rate_limit: u32,

    /// Rate limit window in seconds.
    #[clap(long, default_value_t = 60)]
    pub rate_limit_window_secs: u64,

    /// TTL of cached tool results in seconds.
    #[clap(long, default_value_t = 30)]
    pub tool_cache_ttl_secs: u64,

    /// TTL of the cached stats overview in seconds.
    #[clap(long, default_value_t = 300)]
    pub stats_cache_ttl_secs: u64,

    /// Maximum accepted request body in bytes.
    #[clap(long, default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Seconds granted to in-flight requests on shutdown before forcing exit.
    #[clap(long, default_value_t = 10)]
    pub shutdown_grace_secs: u64,

    /// Optional TOML config file; its values override the flags above.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            host: self.host.clone(),
            port: self.port,
            workspace_root: self.workspace.clone(),
            api_key: self.api_key.clone(),
            project_name: self.project.clone(),
            logging_level: self.logging_level.clone(),
            rate_limit_max_requests: self.rate_limit,
            rate_limit_window_secs: self.rate_limit_window_secs,
            tool_cache_ttl_secs: self.tool_cache_ttl_secs,
            stats_cache_ttl_secs: self.stats_cache_ttl_secs,
            max_body_bytes: self.max_body_bytes,
            shutdown_grace_secs: self.shutdown_grace_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = HubConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    info!(
        "Workspace root {:?}, project {:?}",
        config.workspace_root, config.project_name
    );

    let mut registry = PluginRegistry::new();
    let plugins = builtin_plugins();
    let report = load_plugins(&plugins, &mut registry);
    for (name, reason) in &report.failed {
        warn!("Plugin {:?} was skipped: {}", name, reason);
    }
    let stats = registry.stats();
    info!(
        "Loaded {} plugin(s): {} tools, {} resources, {} prompts",
        report.loaded.len(),
        stats.tools,
        stats.resources,
        stats.prompts
    );

    info!("Ready to serve at port {}!", config.port);
    run_server(config, registry).await
}
