//! Backend Module
//!
//! The minimal get/set/delete capability the cache-aside layer is built on,
//! plus the null backend used when no store is configured.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

// == Backend Trait ==
/// Key/value storage capability with native per-key expiration.
///
/// Keys passed here are already namespaced. Values are UTF-8 JSON text.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Fetches a value; absent and expired keys both yield `None`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value that expires after `ttl`; returns whether the write succeeded.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<bool>;

    /// Removes a key; returns the number of keys removed.
    async fn del(&self, key: &str) -> Result<u64>;

    /// Short diagnostic name of the backend.
    fn kind(&self) -> &'static str;

    /// Releases any held connection. Later calls may reconnect.
    async fn disconnect(&self) {}
}

// == Null Backend ==
/// Backend that stores nothing: every read misses, every write is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

#[async_trait]
impl Backend for NullBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<bool> {
        Ok(false)
    }

    async fn del(&self, _key: &str) -> Result<u64> {
        Ok(0)
    }

    fn kind(&self) -> &'static str {
        "null"
    }
}
