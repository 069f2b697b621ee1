//! Live-update notification bus.
//!
//! Tracks all open SSE subscriber streams and fans hub events out to them.
//! Delivery is best-effort: a slow or broken subscriber is skipped (and
//! pruned) without affecting the others or the request being served.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Per-subscriber buffer; a subscriber this far behind starts losing events.
const SUBSCRIBER_BUFFER: usize = 32;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    /// First frame written to every new subscriber.
    Connected,
    ToolExecuted {
        tool: String,
        duration_ms: u64,
        success: bool,
        cached: bool,
    },
    CacheCleared {
        cache: String,
    },
}

pub struct SseBroadcaster {
    subscribers: RwLock<HashMap<u64, mpsc::Sender<HubEvent>>>,
    next_id: AtomicU64,
}

impl SseBroadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a new subscriber. The connection acknowledgement is already
    /// queued on the returned receiver.
    pub async fn subscribe(&self) -> (u64, mpsc::Receiver<HubEvent>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        // Buffer is empty, cannot fail.
        let _ = tx.try_send(HubEvent::Connected);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().await.insert(id, tx);
        debug!("SSE subscriber {} connected", id);
        (id, rx)
    }

    /// Mandatory cleanup on stream close; leaking dead subscribers leaks
    /// the channel and its buffer.
    pub async fn unsubscribe(&self, id: u64) {
        if self.subscribers.write().await.remove(&id).is_some() {
            debug!("SSE subscriber {} disconnected", id);
        }
    }

    /// Send `event` to every current subscriber without blocking. Returns
    /// the number of subscribers that received it; full or closed channels
    /// are dropped from the set.
    pub async fn broadcast(&self, event: HubEvent) -> usize {
        let mut dead = Vec::new();
        let mut delivered = 0;
        {
            let subscribers = self.subscribers.read().await;
            for (id, tx) in subscribers.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!("SSE subscriber {} is lagging, skipping event", id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => dead.push(*id),
                }
            }
        }
        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in dead {
                subscribers.remove(&id);
            }
        }
        delivered
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Drop every subscriber sender so the corresponding streams terminate.
    /// Part of shutdown: open SSE connections would otherwise keep the
    /// server draining until the grace period forces an exit.
    pub async fn close_all(&self) {
        let mut subscribers = self.subscribers.write().await;
        if !subscribers.is_empty() {
            debug!("Closing {} SSE subscriber stream(s)", subscribers.len());
        }
        subscribers.clear();
    }
}

impl Default for SseBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
