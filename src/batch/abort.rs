//! Abort Signals
//!
//! Cooperative stop conditions polled by the executor before each item starts.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

// == Abort Signal ==
/// A condition checked before starting each new work item.
///
/// Returning `true` stops the executor from admitting further items. Items
/// already in flight always run to completion.
pub trait AbortSignal {
    fn should_abort(&self) -> bool;
}

/// Signal that never fires; used when no predicate is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverAbort;

impl AbortSignal for NeverAbort {
    fn should_abort(&self) -> bool {
        false
    }
}

impl<F> AbortSignal for F
where
    F: Fn() -> bool,
{
    fn should_abort(&self) -> bool {
        self()
    }
}

impl AbortSignal for CancellationToken {
    fn should_abort(&self) -> bool {
        self.is_cancelled()
    }
}

impl AbortSignal for AtomicBool {
    fn should_abort(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}
