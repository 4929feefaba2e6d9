//! Redis Backend Module
//!
//! Live backend over a single lazily established Redis connection.
//!
//! The connection is opened on first use and memoized. Concurrent first
//! callers wait on the same attempt instead of opening their own. A failed
//! attempt leaves nothing memoized, and any connection-class error on a
//! command drops the memoized connection so the next call reconnects.
//! Each established connection gets a new generation number, and an error
//! only tears down the connection of the generation it was raised on.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::backend::Backend;
use crate::error::{CacheError, Result};

/// Memoized connection plus the generation it was established in.
#[derive(Default)]
struct Slot {
    connection: Option<MultiplexedConnection>,
    generation: u64,
}

// == Redis Backend ==
/// Backend backed by a remote Redis store.
pub struct RedisBackend {
    client: Client,
    slot: Mutex<Slot>,
}

impl RedisBackend {
    // == Constructor ==
    /// Creates a backend for `url` without connecting.
    ///
    /// # Errors
    /// Returns `CacheError::Connection` if the connection string is malformed.
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| CacheError::Connection(format!("invalid connection string: {}", e)))?;

        Ok(Self {
            client,
            slot: Mutex::new(Slot::default()),
        })
    }

    /// Returns true if a connection is currently memoized.
    pub async fn is_connected(&self) -> bool {
        self.slot.lock().await.connection.is_some()
    }

    // == Connection ==
    /// Returns the memoized connection and its generation, establishing it on
    /// first use.
    async fn connection(&self) -> Result<(MultiplexedConnection, u64)> {
        let mut slot = self.slot.lock().await;

        if let Some(conn) = slot.connection.as_ref() {
            return Ok((conn.clone(), slot.generation));
        }

        debug!("Opening Redis connection");
        match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => {
                slot.generation = slot.generation.wrapping_add(1);
                info!("Redis connection established (generation {})", slot.generation);
                slot.connection = Some(conn.clone());
                Ok((conn, slot.generation))
            }
            Err(e) => {
                warn!("Redis connection failed: {}", e);
                slot.connection = None;
                Err(CacheError::Connection(e.to_string()))
            }
        }
    }

    /// Drops the memoized connection if `err` means the connection of
    /// `generation` is no longer usable.
    async fn check(&self, err: redis::RedisError, generation: u64) -> CacheError {
        let err = CacheError::from(err);
        if err.is_connection() {
            let mut slot = self.slot.lock().await;
            if slot.generation == generation && slot.connection.take().is_some() {
                warn!("Redis connection error, tearing down: {}", err);
            }
        }
        err
    }
}

/// Converts a TTL to the millisecond argument of `PSETEX`.
fn ttl_millis(ttl: Duration) -> u64 {
    // PSETEX rejects a zero expiry
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl Backend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let (mut conn, generation) = self.connection().await?;
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => Ok(value),
            Err(e) => Err(self.check(e, generation).await),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<bool> {
        let (mut conn, generation) = self.connection().await?;
        match conn.pset_ex::<_, _, ()>(key, value, ttl_millis(ttl)).await {
            Ok(()) => Ok(true),
            Err(e) => Err(self.check(e, generation).await),
        }
    }

    async fn del(&self, key: &str) -> Result<u64> {
        let (mut conn, generation) = self.connection().await?;
        match conn.del::<_, u64>(key).await {
            Ok(removed) => Ok(removed),
            Err(e) => Err(self.check(e, generation).await),
        }
    }

    fn kind(&self) -> &'static str {
        "redis"
    }

    async fn disconnect(&self) {
        if self.slot.lock().await.connection.take().is_some() {
            info!("Redis connection closed");
        }
    }
}
