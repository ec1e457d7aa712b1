//! Shared TTL cache with sharded locking
//!
//! The cache is a best-effort accelerator: no operation fails. Entries are
//! keyed by SHA-256 digests (see [`crate::cache::key`]) and carry a
//! per-entry TTL. Expired entries are evicted lazily on read and in bulk by
//! [`TtlCache::cleanup_expired`], which the maintenance task invokes
//! periodically.
//!
//! Locking discipline: the key space is split across a fixed number of
//! shards, each guarded by its own `RwLock`. No operation holds more than
//! one shard lock at a time; hit/miss counters are atomics updated outside
//! any lock.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::entry::{CacheEntry, CacheValue};
use crate::cache::key::{cache_key, PURPOSE_QUERY_RESPONSE, PURPOSE_VECTOR_STORE};
use crate::retrieval::DocSnippet;

const SHARD_COUNT: usize = 16;

/// Cache statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Fraction of reads that hit, 0.0 when no reads have occurred
    pub hit_rate: f64,
}

/// In-memory TTL cache shared across all concurrent requests
pub struct TtlCache {
    shards: Vec<RwLock<HashMap<String, CacheEntry>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TtlCache {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn shard(&self, key: &str) -> &RwLock<HashMap<String, CacheEntry>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    /// Get a value from the cache. Returns None if absent or expired; an
    /// expired entry is evicted as a side effect of the read.
    pub async fn get(&self, key: &str) -> Option<CacheValue> {
        let shard = self.shard(key);
        {
            let map = shard.read().await;
            match map.get(key) {
                Some(entry) if !entry.is_expired() => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key, "cache hit");
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(key, "cache miss");
                    return None;
                }
            }
        }

        // Expired on first look: re-check under the write lock, another
        // task may have replaced the entry in the meantime.
        let mut map = shard.write().await;
        match map.get(key) {
            Some(entry) if entry.is_expired() => {
                map.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache entry expired");
                None
            }
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a value, overwriting any existing entry under the key.
    pub async fn set(&self, key: &str, value: CacheValue, ttl: Duration) {
        let mut map = self.shard(key).write().await;
        map.insert(key.to_string(), CacheEntry::new(value, ttl));
    }

    /// Delete a cache entry. No-op if absent.
    pub async fn delete(&self, key: &str) {
        let mut map = self.shard(key).write().await;
        map.remove(key);
    }

    /// Clear all entries and reset hit/miss counters.
    pub async fn clear(&self) {
        for shard in &self.shards {
            shard.write().await.clear();
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Remove all expired entries. Snapshots keys per shard under the read
    /// lock before evicting, so no lock is held for the full scan.
    pub async fn cleanup_expired(&self) -> usize {
        let mut evicted = 0;
        for shard in &self.shards {
            let expired: Vec<String> = {
                let map = shard.read().await;
                map.iter()
                    .filter(|(_, entry)| entry.is_expired())
                    .map(|(key, _)| key.clone())
                    .collect()
            };
            if expired.is_empty() {
                continue;
            }
            let mut map = shard.write().await;
            for key in expired {
                // Re-check: the entry may have been overwritten since the snapshot.
                if map.get(&key).is_some_and(|entry| entry.is_expired()) {
                    map.remove(&key);
                    evicted += 1;
                }
            }
        }
        if evicted > 0 {
            debug!(evicted, "cleaned up expired cache entries");
        }
        evicted
    }

    /// Current statistics. Hit rate is 0.0 when no reads have occurred.
    pub async fn stats(&self) -> CacheStats {
        let mut size = 0;
        for shard in &self.shards {
            size += shard.read().await.len();
        }
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        CacheStats {
            size,
            hits,
            misses,
            hit_rate,
        }
    }

    pub async fn len(&self) -> usize {
        let mut size = 0;
        for shard in &self.shards {
            size += shard.read().await.len();
        }
        size
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Get a cached final response for `(query, session_id, domain)`.
    pub async fn get_query_response(
        &self,
        query: &str,
        session_id: &str,
        domain: &str,
    ) -> Option<String> {
        let key = cache_key(PURPOSE_QUERY_RESPONSE, &[query, session_id, domain], &[]);
        match self.get(&key).await {
            Some(CacheValue::Response(response)) => Some(response),
            _ => None,
        }
    }

    /// Cache a final response for `(query, session_id, domain)`.
    pub async fn set_query_response(
        &self,
        query: &str,
        session_id: &str,
        domain: &str,
        response: &str,
        ttl: Duration,
    ) {
        let key = cache_key(PURPOSE_QUERY_RESPONSE, &[query, session_id, domain], &[]);
        self.set(&key, CacheValue::Response(response.to_string()), ttl)
            .await;
    }

    /// Get cached retrieval results for `(query, collection, k)`.
    pub async fn get_documents(
        &self,
        query: &str,
        collection: &str,
        k: usize,
    ) -> Option<Vec<DocSnippet>> {
        let k = k.to_string();
        let key = cache_key(PURPOSE_VECTOR_STORE, &[query, collection], &[("k", &k)]);
        match self.get(&key).await {
            Some(CacheValue::Documents(docs)) => Some(docs),
            _ => None,
        }
    }

    /// Cache retrieval results for `(query, collection, k)`.
    pub async fn set_documents(
        &self,
        query: &str,
        collection: &str,
        k: usize,
        documents: Vec<DocSnippet>,
        ttl: Duration,
    ) {
        let k = k.to_string();
        let key = cache_key(PURPOSE_VECTOR_STORE, &[query, collection], &[("k", &k)]);
        self.set(&key, CacheValue::Documents(documents), ttl).await;
    }
}
