//! Named TTL caches for tool results and derived statistics.
//!
//! Each instance is an independent namespace with its own default TTL.
//! Expired entries behave as misses and are dropped when observed; a
//! periodic `sweep` keeps size accounting honest for keys nobody reads.
//!
//! Concurrent misses on the same key recompute redundantly; there is no
//! single-flight lock. Callers are expected to be idempotent for identical
//! arguments.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;

use crate::metrics::MetricsAggregator;

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

pub struct TtlCache {
    name: String,
    default_ttl: Duration,
    metrics: Option<Arc<MetricsAggregator>>,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub default_ttl_ms: u64,
}

impl TtlCache {
    pub fn new(name: impl Into<String>, default_ttl: Duration) -> Self {
        Self {
            name: name.into(),
            default_ttl,
            metrics: None,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Forward hit/miss observations to the shared aggregator.
    pub fn with_metrics(mut self, metrics: Arc<MetricsAggregator>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cached value, or `None` for unknown and expired keys.
    /// Observing an expired entry removes it.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();

        let hit = match inner.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                inner.entries.remove(key);
                None
            }
            None => None,
        };

        if hit.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        drop(inner);

        if let Some(metrics) = &self.metrics {
            metrics.track_cache(&self.name, hit.is_some());
        }
        hit
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Overwrites any existing entry and resets its expiry.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().entries.clear();
    }

    /// Drop every expired entry. Called from the background sweep task.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.expires_at > now);
        before - inner.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        let total = inner.hits + inner.misses;
        CacheStats {
            name: self.name.clone(),
            size: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                inner.hits as f64 / total as f64
            },
            default_ttl_ms: self.default_ttl.as_millis() as u64,
        }
    }
}
