//! Cache backend implementation on top of DashMap.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cached entry with TTL support.
///
/// The data is wrapped in `Arc` to allow cheap cloning on cache hits.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    /// Create a new cached entry.
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Key/value cache shared by all request handlers.
///
/// ## Cache Modes
///
/// - **Local**: entries live in a DashMap owned by this process
/// - **Disabled**: every read misses and writes are dropped
#[derive(Clone, Debug)]
pub enum CacheBackend {
    Local(Arc<DashMap<String, CachedEntry>>),
    Disabled,
}

impl CacheBackend {
    /// Create a new local cache backend.
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(DashMap::new()))
    }

    /// Build the backend for the `cache.enabled` setting.
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::new_local()
        } else {
            tracing::info!("Response cache disabled");
            CacheBackend::Disabled
        }
    }

    /// Get a value from the cache. Expired entries are evicted and read as
    /// a miss.
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        match self {
            CacheBackend::Local(map) => {
                if let Some(entry) = map.get(key) {
                    if !entry.is_expired() {
                        tracing::debug!(key = %key, "cache hit");
                        return Some(Arc::clone(&entry.data));
                    }
                    // Remove expired entry
                    drop(entry);
                    map.remove(key);
                }
                tracing::debug!(key = %key, "cache miss");
                None
            }
            CacheBackend::Disabled => None,
        }
    }

    /// Set a value in the cache with TTL.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        if let CacheBackend::Local(map) = self {
            map.insert(key.to_string(), CachedEntry::new(value, ttl));
            tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache set");
        }
    }

    /// Invalidate a cache entry.
    pub async fn invalidate(&self, key: &str) {
        if let CacheBackend::Local(map) = self {
            map.remove(key);
            tracing::debug!(key = %key, "cache invalidated");
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        match self {
            CacheBackend::Local(map) => CacheStats {
                entries: map.len(),
                mode: "local",
            },
            CacheBackend::Disabled => CacheStats {
                entries: 0,
                mode: "disabled",
            },
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub mode: &'static str,
}
