//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::time::Duration;

/// Default cache entry lifetime: 3 hours.
pub const DEFAULT_TTL_MS: u64 = 10_800_000;

/// Default number of in-flight batch items.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection string; `None` disables caching (null backend)
    pub redis_url: Option<String>,
    /// Prefix prepended to every cache key
    pub cache_prefix: String,
    /// Default TTL in milliseconds for entries written without explicit TTL
    pub default_ttl_ms: u64,
    /// Concurrency ceiling for batch execution
    pub batch_concurrency: usize,
    /// Diagnostic logging for batch execution
    pub batch_verbose: bool,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Redis connection string (default: unset, caching disabled)
    /// - `CACHE_PREFIX` - Key prefix (default: empty)
    /// - `CACHE_TTL_MS` - Default TTL in milliseconds (default: 10800000)
    /// - `BATCH_CONCURRENCY` - Batch concurrency ceiling (default: 3)
    /// - `BATCH_VERBOSE` - Verbose batch logging, `true`/`1` (default: false)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            cache_prefix: env::var("CACHE_PREFIX").unwrap_or_default(),
            default_ttl_ms: env::var("CACHE_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL_MS),
            batch_concurrency: env::var("BATCH_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CONCURRENCY),
            batch_verbose: env::var("BATCH_VERBOSE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        }
    }

    /// Default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: None,
            cache_prefix: String::new(),
            default_ttl_ms: DEFAULT_TTL_MS,
            batch_concurrency: DEFAULT_CONCURRENCY,
            batch_verbose: false,
            server_port: 3000,
        }
    }
}
