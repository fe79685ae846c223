//! Read-through TTL cache for expensive aggregate reads
//!
//! The cache sits in front of usage-count queries and is never
//! authoritative: every value is re-derivable from the store, ttl = 0
//! disables caching entirely, and every write path that can change an
//! owner's aggregates invalidates that owner's key prefix. Concurrent
//! misses may both compute and both store (last write wins); safe because
//! values are re-derivable.
//!
//! Injected through AppState rather than held in a process-wide singleton,
//! so tests isolate it and multiple service instances share nothing.

use recap_common::Result;
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// TTL cache keyed by string, read-through on miss
pub struct ReadThroughCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> ReadThroughCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value if fresh, otherwise compute, store, return.
    ///
    /// A zero ttl bypasses the cache in both directions.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if !ttl.is_zero() {
            let entries = self.entries.lock().await;
            if let Some(entry) = entries.get(key) {
                if entry.expires_at > Instant::now() {
                    return Ok(entry.value.clone());
                }
            }
        }

        // Lock released during compute: concurrent misses race, which is fine
        let value = compute().await?;

        if !ttl.is_zero() {
            let mut entries = self.entries.lock().await;
            entries.insert(
                key.to_string(),
                CacheEntry {
                    value: value.clone(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }

        Ok(value)
    }

    /// Drop every entry whose key starts with the given prefix.
    ///
    /// Called by every write that can change a cached aggregate.
    pub async fn invalidate_prefix(&self, prefix: &str) {
        let mut entries = self.entries.lock().await;
        entries.retain(|key, _| !key.starts_with(prefix));
    }

    /// Peek without computing (test support)
    pub async fn peek(&self, key: &str) -> Option<V> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }
}

impl<V: Clone> Default for ReadThroughCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
