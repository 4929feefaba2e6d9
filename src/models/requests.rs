//! Request DTOs for the cache service API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum number of entries in one batch write
pub const MAX_BATCH_ENTRIES: usize = 10_000;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value; `null` deletes the key
/// - `ttl_ms`: Optional TTL in milliseconds (uses default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    #[serde(default)]
    pub value: Value,
    /// Optional TTL in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        if self.ttl_ms == Some(0) {
            return Some("TTL must be greater than zero".to_string());
        }
        None
    }

    /// Requested TTL, if any.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }
}

/// Request body for the batch write operation (POST /batch/set)
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSetRequest {
    /// Entries written through the batch executor
    pub entries: Vec<SetRequest>,
}

impl BatchSetRequest {
    /// Validates every entry; reports the first invalid one.
    pub fn validate(&self) -> Option<String> {
        if self.entries.len() > MAX_BATCH_ENTRIES {
            return Some(format!(
                "Batch exceeds maximum of {} entries",
                MAX_BATCH_ENTRIES
            ));
        }
        self.entries.iter().enumerate().find_map(|(index, entry)| {
            entry
                .validate()
                .map(|msg| format!("Entry {}: {}", index, msg))
        })
    }
}
