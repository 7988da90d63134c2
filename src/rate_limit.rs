//! Per-client fixed-window request counter.
//!
//! The limiter never stops a request by itself. It produces a
//! [`RateLimitDecision`] that the pipeline writes into the response before
//! routing: the `X-RateLimit-*` headers always, plus a 429 status and body
//! when the client is over its limit. The handler that runs afterwards
//! replaces that status and body, unless the limiter is configured as
//! blocking.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::DashMap;
use log::{debug, warn};
use serde::Serialize;

use crate::{adapter::ResponseWriter, config::RateLimitConfig, utils::time::now_millis};

/// Key used when the client address cannot be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests seen in the current window
    pub count: u32,
    /// Window start, epoch milliseconds
    pub last_reset: u64,
}

/// Backing state for the limiter.
///
/// Implementations must apply [`RateLimitStore::record`] atomically per key.
pub trait RateLimitStore: Send + Sync {
    /// Counts one request from `key` at `now` and returns the updated entry.
    ///
    /// Creates the entry with `count = 0, last_reset = now` when missing,
    /// resets it when `now - last_reset > window_ms`, then increments.
    fn record(&self, key: &str, now: u64, window_ms: u64) -> RateLimitEntry;

    /// Drops entries whose window started before `cutoff`. Returns how many.
    fn evict_before(&self, cutoff: u64) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store. Each instance of the service throttles on its own.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn record(&self, key: &str, now: u64, window_ms: u64) -> RateLimitEntry {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                last_reset: now,
            });

        if now.saturating_sub(entry.last_reset) > window_ms {
            entry.count = 0;
            entry.last_reset = now;
        }
        entry.count = entry.count.saturating_add(1);

        *entry
    }

    fn evict_before(&self, cutoff: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_reset >= cutoff);
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Body sent with a 429
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitExceeded {
    pub error: String,
    pub message: String,
    pub retry_after: u64,
}

/// Outcome of counting one request
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub limit: u32,
    pub count: u32,
    /// Epoch seconds at which the current window ends
    pub reset_at: u64,
    /// Seconds until the window ends, set only when over the limit
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    pub fn exceeded(&self) -> bool {
        self.retry_after.is_some()
    }

    /// May be negative once the client is over its limit
    pub fn remaining(&self) -> i64 {
        i64::from(self.limit) - i64::from(self.count)
    }

    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining().to_string()),
            ("X-RateLimit-Reset", self.reset_at.to_string()),
        ]
    }

    /// Writes the headers and, when over the limit, the 429 status and body.
    pub fn apply(&self, res: &mut ResponseWriter) {
        if let Some(retry_after) = self.retry_after {
            res.status(429).json(&RateLimitExceeded {
                error: "Too many requests".to_string(),
                message: "Please try again later".to_string(),
                retry_after,
            });
        }
        for (name, value) in self.headers() {
            res.set_header(name, value);
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    limit: u32,
    window_ms: u64,
    blocking: bool,
    evict_after_ms: u64,
    last_sweep: Arc<AtomicU64>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryRateLimitStore::new()))
    }

    pub fn with_store(config: &RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        let window_ms = config.window_ms.max(1);
        Self {
            store,
            limit: config.requests_per_window.max(1),
            window_ms,
            blocking: config.blocking,
            evict_after_ms: window_ms.saturating_mul(u64::from(config.evict_factor.max(1))),
            last_sweep: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether an exceeded limit should finish the response before routing
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }

    pub fn check(&self, client: &str) -> RateLimitDecision {
        self.check_at(client, now_millis())
    }

    pub fn check_at(&self, client: &str, now: u64) -> RateLimitDecision {
        self.maybe_sweep(now);

        let entry = self.store.record(client, now, self.window_ms);
        let window_end = entry.last_reset + self.window_ms;
        let retry_after = (entry.count > self.limit)
            .then(|| window_end.saturating_sub(now).div_ceil(1000));

        if let Some(seconds) = retry_after {
            warn!(
                "Rate limit exceeded for {}: {} requests, retry after {}s",
                client, entry.count, seconds
            );
        }

        RateLimitDecision {
            limit: self.limit,
            count: entry.count,
            reset_at: window_end.div_ceil(1000),
            retry_after,
        }
    }

    /// Drops clients idle for longer than the eviction horizon
    pub fn sweep(&self, now: u64) -> usize {
        let evicted = self
            .store
            .evict_before(now.saturating_sub(self.evict_after_ms));
        if evicted > 0 {
            debug!("Evicted {} idle rate limit entries", evicted);
        }
        evicted
    }

    // At most one lazy sweep per window
    fn maybe_sweep(&self, now: u64) {
        let last = self.last_sweep.load(Ordering::Relaxed);
        if now.saturating_sub(last) < self.window_ms {
            return;
        }
        if self
            .last_sweep
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            self.sweep(now);
        }
    }
}

/// Rate limit key for a source address
pub fn client_key(addr: Option<&str>) -> String {
    addr.map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
