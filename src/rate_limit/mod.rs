//! Per-IP rate limiting.
//!
//! Fixed window: each client address keeps `(window_start, count)`; the
//! window resets once it is older than the configured duration. Loopback
//! and container-internal addresses bypass limiting entirely.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rate limit configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of a rate limit check, surfaced as response headers.
#[derive(Debug, Clone, PartialEq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_in_secs: u64,
}

#[derive(Debug)]
struct ClientWindow {
    window_start: Instant,
    count: u32,
}

impl ClientWindow {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            count: 0,
        }
    }

    fn reset_if_expired(&mut self, window: Duration) {
        if self.window_start.elapsed() > window {
            self.count = 0;
            self.window_start = Instant::now();
        }
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<IpAddr, ClientWindow>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request from `ip` and decide whether it may proceed.
    /// A missing record is a fresh window starting now.
    pub fn check(&self, ip: IpAddr) -> RateDecision {
        if is_exempt(ip) {
            return RateDecision {
                allowed: true,
                limit: u32::MAX,
                remaining: u32::MAX,
                reset_in_secs: 0,
            };
        }

        let mut windows = self.windows.lock().unwrap();
        let state = windows.entry(ip).or_insert_with(ClientWindow::new);
        state.reset_if_expired(self.config.window);

        state.count += 1;
        let allowed = state.count <= self.config.max_requests;
        let remaining = self.config.max_requests.saturating_sub(state.count);
        let reset_in_secs = self
            .config
            .window
            .as_secs()
            .saturating_sub(state.window_start.elapsed().as_secs())
            .max(1);

        RateDecision {
            allowed,
            limit: self.config.max_requests,
            remaining,
            reset_in_secs,
        }
    }

    /// Drop records whose window is already over. Bounds memory for clients
    /// that stopped sending requests.
    pub fn sweep(&self) -> usize {
        let window = self.config.window;
        let mut windows = self.windows.lock().unwrap();
        let before = windows.len();
        windows.retain(|_, state| state.window_start.elapsed() <= window);
        before - windows.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().unwrap().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Loopback and docker-internal addresses are never throttled.
fn is_exempt(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.octets()[..2] == [172, 17],
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}
