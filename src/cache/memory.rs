//! Memory Backend Module
//!
//! In-process backend with per-key TTL. Mirrors the expiration semantics of
//! the remote store so cache-aside behavior can be exercised without one.
//!
//! Not a production backend: the factory only ever yields the Redis or the
//! null backend, and this type exists for tests and local experiments.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::backend::Backend;
use crate::cache::entry::CacheEntry;
use crate::error::Result;

// == Memory Backend ==
/// HashMap-backed storage with lazy expiration on read.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryBackend {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Purged {} expired entries", removed);
        }
        removed
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Returns the remaining TTL of a live key in milliseconds.
    pub async fn ttl_remaining_ms(&self, key: &str) -> Option<u64> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(CacheEntry::ttl_remaining_ms)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<u64> {
        let mut entries = self.entries.write().await;
        match entries.remove(key) {
            Some(entry) if !entry.is_expired() => Ok(1),
            _ => Ok(0),
        }
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
