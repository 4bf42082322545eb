//! Cooperative cancellation shared by every walker unit.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-writer-many-readers stop flag.
///
/// Raising it never interrupts work in flight: walker units check it once,
/// right after they are admitted, and skip their directory if it is set.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that no new work be started.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
