//! Time-bucketed in-memory cache for fetch results.
//!
//! Keys combine the ticker with the current hour bucket (`600519:475512`), so
//! a cached quote never outlives the hour it was fetched in, even when the TTL
//! is longer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{Ticker, UtcDateTime};

const BUCKET_SECONDS: i64 = 3_600;

/// Default time-to-live for cached entries.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Per-call cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Serve a live entry when present, otherwise fetch and store.
    #[default]
    Use,
    /// Always fetch, then overwrite the entry.
    Refresh,
    /// Always fetch and leave the cache untouched.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

/// Cache key for `ticker` in the hour bucket containing `at`.
pub fn bucket_key(ticker: &Ticker, at: UtcDateTime) -> String {
    let bucket = at.unix_timestamp().div_euclid(BUCKET_SECONDS);
    format!("{}:{bucket}", ticker.as_str())
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner<V> {
    map: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

/// Thread-safe TTL cache shared by concurrent fetches.
#[derive(Debug)]
pub struct BucketCache<V> {
    inner: Arc<tokio::sync::RwLock<CacheInner<V>>>,
}

impl<V> Clone for BucketCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone> BucketCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
                ttl,
            })),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let inner = self.inner.read().await;
        inner
            .map
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    /// Stores `value` with a fresh TTL. A zero TTL stores nothing.
    pub async fn put(&self, key: String, value: V) {
        let mut inner = self.inner.write().await;
        if inner.ttl.is_zero() {
            return;
        }
        let expires_at = Instant::now() + inner.ttl;
        inner.map.insert(key, CacheEntry { value, expires_at });
    }

    /// Drops expired entries and returns how many were removed.
    pub async fn clear_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.map.len();
        let now = Instant::now();
        inner.map.retain(|_, entry| entry.expires_at > now);
        before - inner.map.len()
    }

    /// Entry count, expired entries included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }
}
