use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;

use crate::cache::TtlCache;
use crate::config::HubConfig;
use crate::events::SseBroadcaster;
use crate::metrics::MetricsAggregator;
use crate::persist::{NotificationStore, SettingsStore};
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::registry::{PluginRegistry, ToolContext};

pub type GuardedRegistry = Arc<PluginRegistry>;
pub type GuardedCache = Arc<TtlCache>;
pub type GuardedRateLimiter = Arc<RateLimiter>;
pub type GuardedMetrics = Arc<MetricsAggregator>;
pub type GuardedBroadcaster = Arc<SseBroadcaster>;
pub type GuardedSettings = Arc<SettingsStore>;
pub type GuardedNotifications = Arc<NotificationStore>;

#[derive(Clone)]
pub struct HubState {
    pub config: HubConfig,
    pub start_time: Instant,
    pub registry: GuardedRegistry,
    pub tool_cache: GuardedCache,
    pub stats_cache: GuardedCache,
    pub rate_limiter: GuardedRateLimiter,
    pub metrics: GuardedMetrics,
    pub broadcaster: GuardedBroadcaster,
    pub settings: GuardedSettings,
    pub notifications: GuardedNotifications,
}

impl HubState {
    /// Wire every shared component from a resolved config and a populated
    /// registry. Plugin loading must be finished before this is called.
    pub fn new(config: HubConfig, registry: PluginRegistry) -> Self {
        let metrics = Arc::new(MetricsAggregator::new());
        let tool_cache = Arc::new(
            TtlCache::new("tool_results", config.tool_cache_ttl).with_metrics(metrics.clone()),
        );
        let stats_cache =
            Arc::new(TtlCache::new("stats", config.stats_cache_ttl).with_metrics(metrics.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            max_requests: config.rate_limit_max_requests,
            window: config.rate_limit_window,
        }));
        let data_dir = config.data_dir();

        Self {
            start_time: metrics.start_time(),
            registry: Arc::new(registry),
            tool_cache,
            stats_cache,
            rate_limiter,
            metrics,
            broadcaster: Arc::new(SseBroadcaster::new()),
            settings: Arc::new(SettingsStore::new(data_dir.join("settings.json"))),
            notifications: Arc::new(NotificationStore::new(data_dir.join("notifications.json"))),
            config,
        }
    }

    /// Context handed to tool/resource/prompt handlers.
    pub fn tool_context(&self) -> ToolContext {
        ToolContext {
            workspace_root: self.config.workspace_root.clone(),
            project_name: self.config.project_name.clone(),
            start_time: self.start_time,
        }
    }
}

impl FromRef<HubState> for GuardedRegistry {
    fn from_ref(input: &HubState) -> Self {
        input.registry.clone()
    }
}

impl FromRef<HubState> for GuardedMetrics {
    fn from_ref(input: &HubState) -> Self {
        input.metrics.clone()
    }
}

impl FromRef<HubState> for GuardedBroadcaster {
    fn from_ref(input: &HubState) -> Self {
        input.broadcaster.clone()
    }
}

impl FromRef<HubState> for HubConfig {
    fn from_ref(input: &HubState) -> Self {
        input.config.clone()
    }
}
