//! Cache-Aside Module
//!
//! Read-through and write-through access to a [`Backend`] with key
//! prefixing, per-key TTL and date-aware JSON encoding.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::backend::Backend;
use crate::cache::codec::{decode, encode};
use crate::cache::stats::{CacheStats, StatsSnapshot};
use crate::config::{Config, DEFAULT_TTL_MS};
use crate::error::{CacheError, Result};

// == Cache Aside ==
/// Cache-aside store over a live or null backend.
///
/// `getset` does not de-duplicate concurrent misses: callers racing on the
/// same missing key each run their compute function and the last write wins.
pub struct CacheAside {
    /// Storage capability
    backend: Arc<dyn Backend>,
    /// Prepended to every logical key
    prefix: String,
    /// TTL applied when a write names none
    default_ttl: Duration,
    /// Activity counters
    stats: CacheStats,
}

impl CacheAside {
    // == Constructor ==
    /// Creates a cache over `backend` with the default 3 hour TTL.
    ///
    /// # Arguments
    /// * `backend` - Live or null backend
    /// * `prefix` - Namespace prepended to every key
    pub fn new(backend: Arc<dyn Backend>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
            default_ttl: Duration::from_millis(DEFAULT_TTL_MS),
            stats: CacheStats::new(),
        }
    }

    /// Creates a cache using the prefix and default TTL from `config`.
    pub fn from_config(backend: Arc<dyn Backend>, config: &Config) -> Self {
        Self::new(backend, config.cache_prefix.clone()).with_default_ttl(config.default_ttl())
    }

    /// Overrides the TTL used when none is given.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns current activity counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    // == Get ==
    /// Reads and decodes the value stored under `key`.
    ///
    /// Absent and expired keys both return `Ok(None)`.
    ///
    /// # Errors
    /// Backend failures, and `CacheError::Serialization` for malformed content.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.full_key(key);

        match self.backend.get(&full_key).await? {
            Some(text) => {
                self.stats.record_hit();
                debug!("Cache hit: {}", full_key);
                Ok(Some(decode(&text)?))
            }
            None => {
                self.stats.record_miss();
                debug!("Cache miss: {}", full_key);
                Ok(None)
            }
        }
    }

    // == Get Or Compute ==
    /// Returns the cached value for `key`, or computes, stores and returns it.
    ///
    /// On a miss `compute` runs exactly once. A present result is written with
    /// `ttl` (or the default TTL); an absent result (one that serializes to
    /// `null`, such as `None`) deletes the key instead. The computed value is
    /// returned either way.
    ///
    /// # Errors
    /// Errors from `compute` are returned unchanged and nothing is written.
    /// Cache errors are converted into `E`.
    pub async fn getset<T, E, F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl: Option<Duration>,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await? {
            return Ok(cached);
        }

        self.stats.record_compute();
        let value = compute().await?;
        self.set(key, &value, ttl).await?;

        Ok(value)
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// An absent value deletes the key and returns whether a key was removed.
    /// Otherwise returns whether the backend accepted the write.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        match encode(value)? {
            None => self.delete(key).await,
            Some(text) => {
                let full_key = self.full_key(key);
                let ttl = ttl.unwrap_or(self.default_ttl);
                let written = self.backend.set(&full_key, text, ttl).await?;
                if written {
                    self.stats.record_write();
                    debug!("Cache write: {} (ttl {}ms)", full_key, ttl.as_millis());
                }
                Ok(written)
            }
        }
    }

    // == Delete ==
    /// Removes `key`; returns whether a key was actually removed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.backend.del(&self.full_key(key)).await?;
        self.stats.record_deletes(removed);
        Ok(removed > 0)
    }
}

impl std::fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAside")
            .field("backend", &self.backend.kind())
            .field("prefix", &self.prefix)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
