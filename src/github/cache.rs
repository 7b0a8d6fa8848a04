//! In-memory TTL cache for API responses.
//!
//! The cache is read-through from the client's perspective: lookups evict
//! expired entries lazily, and only successful responses are ever stored.
//! Failures are never cached.

use crate::model::{Issue, RawComment};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Typed payload stored against one cache key.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    Issues(Vec<Issue>),
    Comments(Vec<RawComment>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: CachedPayload,
    expires_at: Instant,
}

/// Thread-safe TTL cache keyed by operation-scoped strings.
///
/// Keys follow the `search:{owner}/{repo}:{query}` and
/// `comments:{owner}/{repo}:{number}` conventions set by the client.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, evicting it first if it has expired.
    pub fn get(&self, key: &str) -> Option<CachedPayload> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.payload.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a payload under a key with the given TTL.
    pub fn put(&self, key: impl Into<String>, payload: CachedPayload, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.into(),
            CacheEntry {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Remove every expired entry. Lazy eviction on lookup is the primary
    /// mechanism; this sweep is optional housekeeping.
    pub fn clear_expired(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
    }

    /// Number of live entries (including any not yet lazily evicted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Check if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
