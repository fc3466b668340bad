//! Cache Store Module
//!
//! The `CacheBackend` seam the orchestrator reads and writes through, and the
//! process-wide in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker};
use crate::error::Result;

// == Cache Backend ==
/// Key/value store for response bodies keyed by request identity.
///
/// Reads never evict, and the TTL check belongs to the caller. Writes to the
/// same key are last-write-wins.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// A name for tracing.
    fn name(&self) -> &'static str;

    /// Returns the entry stored under `key`, stale or not.
    async fn read(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Stores `entry` under `key`, replacing any previous entry.
    async fn write(&self, key: &str, entry: CacheEntry) -> Result<()>;
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: CacheStats,
}

// == Memory Cache ==
/// Thread-safe in-memory cache bounded by entry count.
///
/// Construct one per process, wrap it in an `Arc` and hand it to every
/// controller that should share responses.
#[derive(Debug)]
pub struct MemoryCache {
    inner: RwLock<Inner>,
    max_entries: usize,
}

impl MemoryCache {
    /// Creates a cache holding at most `max_entries` responses (minimum 1).
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &crate::config::FetchConfig) -> Self {
        Self::new(config.max_cache_entries)
    }

    // == Remove ==
    /// Drops the entry for `key`. Returns whether one existed.
    pub async fn remove(&self, key: &str) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner.entries.remove(key).is_some();
        if removed {
            inner.lru.remove(key);
            let count = inner.entries.len();
            inner.stats.set_total_entries(count);
        }
        removed
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.lru.clear();
        inner.stats.set_total_entries(0);
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_CACHE_ENTRIES)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        // Write lock: a hit refreshes recency and both outcomes update stats
        let mut inner = self.inner.write().await;
        let entry = inner.entries.get(key).cloned();
        inner.stats.record_read(entry.is_some());
        if entry.is_some() {
            inner.lru.touch(key);
        }
        Ok(entry)
    }

    async fn write(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let mut inner = self.inner.write().await;

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.max_entries {
            if let Some(evicted) = inner.lru.evict_oldest() {
                inner.entries.remove(&evicted);
                inner.stats.record_eviction();
                debug!("Evicted cached response for {}", evicted);
            }
        }

        inner.entries.insert(key.to_string(), entry);
        inner.lru.touch(key);
        inner.stats.record_write();
        let count = inner.entries.len();
        inner.stats.set_total_entries(count);
        Ok(())
    }
}
