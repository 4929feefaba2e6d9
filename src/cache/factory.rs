//! Backend Factory Module
//!
//! Chooses the backend at startup from the configured connection string.

use std::sync::Arc;

use tracing::info;

use crate::cache::backend::{Backend, NullBackend};
use crate::cache::redis::RedisBackend;
use crate::config::Config;
use crate::error::Result;

/// Returns a Redis backend when a connection string is configured, otherwise
/// the null backend.
///
/// No connection is opened here; the Redis backend connects on first use.
///
/// # Errors
/// Returns `CacheError::Connection` if the connection string is malformed.
pub fn connect_backend(config: &Config) -> Result<Arc<dyn Backend>> {
    match config.redis_url.as_deref() {
        Some(url) => {
            info!("Cache backend: redis");
            Ok(Arc::new(RedisBackend::new(url)?))
        }
        None => {
            info!("Cache backend: null (no REDIS_URL configured, caching disabled)");
            Ok(Arc::new(NullBackend))
        }
    }
}
