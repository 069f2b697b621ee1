//! Plugin loading.
//!
//! A plugin is a unit that contributes tools/resources/prompts through a
//! registration entry point. Discovery is static (`builtin_plugins`); the
//! loader isolates failures so one broken plugin never prevents the rest
//! from registering. Loading runs to completion before the server starts
//! accepting traffic.

pub mod diagnostics;
pub mod process;
pub mod workspace;

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{error, info};

use crate::registry::PluginRegistry;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn register(&self, registry: &mut PluginRegistry) -> anyhow::Result<()>;
}

/// Outcome of a load pass, reported once at startup.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// The plugins compiled into this hub, in registration order.
pub fn builtin_plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(workspace::WorkspacePlugin),
        Box::new(diagnostics::DiagnosticsPlugin),
    ]
}

/// Run every plugin's registration callback against the shared registry.
/// Both `Err` returns and panics are caught, logged and skipped.
pub fn load_plugins(plugins: &[Box<dyn Plugin>], registry: &mut PluginRegistry) -> LoadReport {
    let mut report = LoadReport::default();

    for plugin in plugins {
        let name = plugin.name().to_string();
        let outcome = catch_unwind(AssertUnwindSafe(|| plugin.register(registry)));
        match outcome {
            Ok(Ok(())) => {
                info!("Plugin '{}' registered", name);
                report.loaded.push(name);
            }
            Ok(Err(e)) => {
                error!("Plugin '{}' failed to register: {}", name, e);
                report.failed.push((name, e.to_string()));
            }
            Err(_) => {
                error!("Plugin '{}' panicked during registration", name);
                report.failed.push((name, "panicked during registration".into()));
            }
        }
    }

    let stats = registry.stats();
    info!(
        "Plugin load complete: {} plugins ok, {} failed ({} tools, {} resources, {} prompts)",
        report.loaded.len(),
        report.failed.len(),
        stats.tools,
        stats.resources,
        stats.prompts
    );
    report
}
