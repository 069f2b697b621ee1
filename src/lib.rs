//! Toolhub Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod paths;
pub mod persist;
pub mod plugins;
pub mod rate_limit;
pub mod registry;
pub mod server;

// Re-export commonly used types for convenience
pub use config::{CliConfig, FileConfig, HubConfig};
pub use error::HubError;
pub use plugins::{builtin_plugins, load_plugins, Plugin};
pub use registry::PluginRegistry;
pub use server::{make_app, run_server, HubState, RequestsLoggingLevel, HEADER_API_KEY};
