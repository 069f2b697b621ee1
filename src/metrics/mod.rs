//! Request/tool/cache metrics.
//!
//! One `MetricsAggregator` instance is built at startup and shared through
//! the server state. It keeps two views of the same observations: plain
//! counters and duration samples for the JSON snapshot endpoint, and
//! prometheus collectors for the text exposition endpoint.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use tracing::error;

/// Metric name prefix for all hub metrics.
const PREFIX: &str = "toolhub";

/// Max retained duration samples for percentile derivation.
const MAX_DURATION_SAMPLES: usize = 4096;

#[derive(Default)]
struct PlainCounters {
    requests_by_route: HashMap<String, u64>,
    tool_success: HashMap<String, u64>,
    tool_failure: HashMap<String, u64>,
    cache_hits: HashMap<String, u64>,
    cache_misses: HashMap<String, u64>,
    errors_by_kind: HashMap<String, u64>,
    rate_limited_total: u64,
    requests_total: u64,
    tool_durations_ms: Vec<f64>,
}

pub struct MetricsAggregator {
    registry: Registry,
    http_requests: CounterVec,
    tool_executions: CounterVec,
    cache_events: CounterVec,
    rate_limit_hits: CounterVec,
    errors: CounterVec,
    tool_duration_seconds: HistogramVec,
    start_time: Instant,
    plain: Mutex<PlainCounters>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolExecutionStats {
    pub success: u64,
    pub failure: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DurationPercentiles {
    pub samples: usize,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub requests_total: u64,
    pub requests_by_route: HashMap<String, u64>,
    pub tool_executions: HashMap<String, ToolExecutionStats>,
    pub cache_hits: HashMap<String, u64>,
    pub cache_misses: HashMap<String, u64>,
    pub errors_by_kind: HashMap<String, u64>,
    pub rate_limited_total: u64,
    pub tool_duration: DurationPercentiles,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests = CounterVec::new(
            Opts::new(
                format!("{PREFIX}_http_requests_total"),
                "Total number of HTTP requests",
            ),
            &["method", "path"],
        )
        .expect("http_requests_total opts are static");

        let tool_executions = CounterVec::new(
            Opts::new(
                format!("{PREFIX}_tool_executions_total"),
                "Total tool executions by tool and status",
            ),
            &["tool", "status"],
        )
        .expect("tool_executions_total opts are static");

        let cache_events = CounterVec::new(
            Opts::new(
                format!("{PREFIX}_cache_events_total"),
                "Cache lookups by cache name and outcome",
            ),
            &["cache", "outcome"],
        )
        .expect("cache_events_total opts are static");

        let rate_limit_hits = CounterVec::new(
            Opts::new(
                format!("{PREFIX}_rate_limit_hits_total"),
                "Requests rejected by the rate limiter",
            ),
            &["client"],
        )
        .expect("rate_limit_hits_total opts are static");

        let errors = CounterVec::new(
            Opts::new(format!("{PREFIX}_errors_total"), "Errors by kind"),
            &["kind"],
        )
        .expect("errors_total opts are static");

        let tool_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                format!("{PREFIX}_tool_duration_seconds"),
                "Tool handler duration in seconds",
            )
            .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
            &["tool"],
        )
        .expect("tool_duration_seconds opts are static");

        for collector in [
            Box::new(http_requests.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(tool_executions.clone()),
            Box::new(cache_events.clone()),
            Box::new(rate_limit_hits.clone()),
            Box::new(errors.clone()),
            Box::new(tool_duration_seconds.clone()),
        ] {
            // Registration over a fresh registry cannot collide.
            let _ = registry.register(collector);
        }

        Self {
            registry,
            http_requests,
            tool_executions,
            cache_events,
            rate_limit_hits,
            errors,
            tool_duration_seconds,
            start_time: Instant::now(),
            plain: Mutex::new(PlainCounters::default()),
        }
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn track_request(&self, method: &str, path: &str) {
        self.http_requests.with_label_values(&[method, path]).inc();
        let mut plain = self.plain.lock().unwrap();
        plain.requests_total += 1;
        *plain
            .requests_by_route
            .entry(format!("{} {}", method, path))
            .or_default() += 1;
    }

    pub fn track_tool_execution(&self, tool: &str, success: bool, duration: Duration) {
        let status = if success { "success" } else { "failure" };
        self.tool_executions
            .with_label_values(&[tool, status])
            .inc();
        self.tool_duration_seconds
            .with_label_values(&[tool])
            .observe(duration.as_secs_f64());

        let mut plain = self.plain.lock().unwrap();
        let counts = if success {
            &mut plain.tool_success
        } else {
            &mut plain.tool_failure
        };
        *counts.entry(tool.to_string()).or_default() += 1;
        if plain.tool_durations_ms.len() >= MAX_DURATION_SAMPLES {
            // Drop the oldest half rather than shifting on every sample.
            plain.tool_durations_ms.drain(..MAX_DURATION_SAMPLES / 2);
        }
        plain
            .tool_durations_ms
            .push(duration.as_secs_f64() * 1000.0);
    }

    pub fn track_cache(&self, cache: &str, hit: bool) {
        let outcome = if hit { "hit" } else { "miss" };
        self.cache_events.with_label_values(&[cache, outcome]).inc();
        let mut plain = self.plain.lock().unwrap();
        let counts = if hit {
            &mut plain.cache_hits
        } else {
            &mut plain.cache_misses
        };
        *counts.entry(cache.to_string()).or_default() += 1;
    }

    pub fn track_rate_limited(&self, client: &str) {
        self.rate_limit_hits.with_label_values(&[client]).inc();
        self.plain.lock().unwrap().rate_limited_total += 1;
    }

    pub fn track_error(&self, kind: &str) {
        self.errors.with_label_values(&[kind]).inc();
        *self
            .plain
            .lock()
            .unwrap()
            .errors_by_kind
            .entry(kind.to_string())
            .or_default() += 1;
    }

    /// Point-in-time aggregate view, serialized by `/api/metrics`.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let plain = self.plain.lock().unwrap();

        let mut tools: HashMap<String, ToolExecutionStats> = HashMap::new();
        for (tool, count) in &plain.tool_success {
            tools
                .entry(tool.clone())
                .or_insert(ToolExecutionStats {
                    success: 0,
                    failure: 0,
                })
                .success = *count;
        }
        for (tool, count) in &plain.tool_failure {
            tools
                .entry(tool.clone())
                .or_insert(ToolExecutionStats {
                    success: 0,
                    failure: 0,
                })
                .failure = *count;
        }

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            requests_total: plain.requests_total,
            requests_by_route: plain.requests_by_route.clone(),
            tool_executions: tools,
            cache_hits: plain.cache_hits.clone(),
            cache_misses: plain.cache_misses.clone(),
            errors_by_kind: plain.errors_by_kind.clone(),
            rate_limited_total: plain.rate_limited_total,
            tool_duration: percentiles(&plain.tool_durations_ms),
        }
    }

    /// Prometheus text exposition of the same state.
    pub fn to_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&families, &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn percentiles(samples_ms: &[f64]) -> DurationPercentiles {
    if samples_ms.is_empty() {
        return DurationPercentiles {
            samples: 0,
            p50_ms: 0.0,
            p90_ms: 0.0,
            p99_ms: 0.0,
        };
    }
    let mut sorted = samples_ms.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pick = |p: f64| {
        let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    };
    DurationPercentiles {
        samples: sorted.len(),
        p50_ms: pick(50.0),
        p90_ms: pick(90.0),
        p99_ms: pick(99.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_requests() {
        let metrics = MetricsAggregator::new();
        metrics.track_request("GET", "/health");
        metrics.track_request("GET", "/health");
        metrics.track_request("POST", "/api/tools/echo");

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_total, 3);
        assert_eq!(snap.requests_by_route.get("GET /health"), Some(&2));
    }

    #[test]
    fn test_tool_execution_success_and_failure() {
        let metrics = MetricsAggregator::new();
        metrics.track_tool_execution("scan", true, Duration::from_millis(10));
        metrics.track_tool_execution("scan", true, Duration::from_millis(30));
        metrics.track_tool_execution("scan", false, Duration::from_millis(5));

        let snap = metrics.snapshot();
        let stats = snap.tool_executions.get("scan").unwrap();
        assert_eq!(stats.success, 2);
        assert_eq!(stats.failure, 1);
        assert_eq!(snap.tool_duration.samples, 3);
    }

    #[test]
    fn test_cache_tallies_are_per_cache() {
        let metrics = MetricsAggregator::new();
        metrics.track_cache("tools", true);
        metrics.track_cache("tools", false);
        metrics.track_cache("stats", false);

        let snap = metrics.snapshot();
        assert_eq!(snap.cache_hits.get("tools"), Some(&1));
        assert_eq!(snap.cache_misses.get("tools"), Some(&1));
        assert_eq!(snap.cache_misses.get("stats"), Some(&1));
        assert!(snap.cache_hits.get("stats").is_none());
    }

    #[test]
    fn test_prometheus_exposition_contains_families() {
        let metrics = MetricsAggregator::new();
        metrics.track_request("GET", "/health");
        metrics.track_tool_execution("echo", true, Duration::from_millis(1));
        metrics.track_rate_limited("10.0.0.9");
        metrics.track_error("not_found");

        let text = metrics.to_prometheus();
        assert!(text.contains("toolhub_http_requests_total"));
        assert!(text.contains("toolhub_tool_executions_total"));
        assert!(text.contains("toolhub_rate_limit_hits_total"));
        assert!(text.contains("toolhub_errors_total"));
        assert!(text.contains("toolhub_tool_duration_seconds"));
    }

    #[test]
    fn test_percentiles_of_known_distribution() {
        let samples: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let p = percentiles(&samples);
        assert_eq!(p.samples, 100);
        assert!((p.p50_ms - 50.0).abs() <= 1.0);
        assert!((p.p90_ms - 90.0).abs() <= 1.0);
        assert!((p.p99_ms - 99.0).abs() <= 1.0);
    }

    #[test]
    fn test_percentiles_empty() {
        let p = percentiles(&[]);
        assert_eq!(p.samples, 0);
        assert_eq!(p.p50_ms, 0.0);
    }
}
