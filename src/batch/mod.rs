//! Batch Module
//!
//! Provides bounded-concurrency execution of async work items with
//! cooperative early termination.

mod abort;
mod executor;


// Re-export public types
pub use abort::{AbortSignal, NeverAbort};
pub use executor::BatchExecutor;
