//! Cache entry with per-entry TTL

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retrieval::DocSnippet;

/// Value stored in the cache.
///
/// The cache holds two kinds of payloads: final response strings (the
/// `query_response` namespace) and retrieval results (the `vector_store`
/// namespace). A namespace helper that finds the other variant under its
/// key treats the entry as a miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CacheValue {
    Response(String),
    Documents(Vec<DocSnippet>),
}

/// A cache entry with expiration
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CacheValue,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(value: CacheValue, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Utc::now(),
            ttl,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        let ttl = chrono::Duration::from_std(self.ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(3600));
        Utc::now() > self.created_at + ttl
    }

    /// Time remaining before expiry, or None if already expired
    pub fn time_until_expiry(&self) -> Option<Duration> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(3600));
        let expires_at = self.created_at + ttl;
        let now = Utc::now();
        if now > expires_at {
            None
        } else {
            (expires_at - now).to_std().ok()
        }
    }
}
