//! Batch Cache - bounded-concurrency batch execution and cache-aside storage
//!
//! Provides a batch executor with a drain barrier and cooperative abort, and
//! a cache-aside store over Redis or a null backend.

pub mod api;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use batch::{AbortSignal, BatchExecutor};
pub use cache::{Backend, CacheAside};
pub use config::Config;
pub use error::{CacheError, Result};
