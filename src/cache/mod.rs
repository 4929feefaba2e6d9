//! Cache Module
//!
//! Provides cache-aside access over a pluggable key/value backend with TTL
//! expiration and date-aware JSON encoding.

mod aside;
mod backend;
pub mod codec;
mod entry;
mod factory;
mod memory;
mod redis;
mod stats;


// Re-export public types
pub use self::redis::RedisBackend;
pub use aside::CacheAside;
pub use backend::{Backend, NullBackend};
pub use entry::CacheEntry;
pub use factory::connect_backend;
// Test and development backend, never chosen by `connect_backend`
pub use memory::MemoryBackend;
pub use stats::{CacheStats, StatsSnapshot};
