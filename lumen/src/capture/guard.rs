//! Depth tracking for structural capture.
//!
//! A thread-local counter bounds recursion depth across nested `capture()` calls
//! without threading an explicit depth parameter through every [`super::Capture`]
//! implementation.

use std::cell::Cell;

thread_local! {
    static DEPTH: Cell<usize> = Cell::new(0);
}

/// RAII token for one level of capture depth. Obtained via [`CaptureGuard::enter`];
/// decrements the thread-local depth counter on drop.
pub struct CaptureGuard {
    max_depth: usize,
}

impl CaptureGuard {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Attempts to enter one more level of depth, returning a scope token that
    /// decrements the counter when dropped. Returns `None` once `max_depth` has
    /// already been reached by the current call chain.
    pub fn enter(&self) -> Option<DepthScope> {
        DepthScope::try_enter(self.max_depth)
    }
}

pub struct DepthScope;

impl DepthScope {
    fn try_enter(max_depth: usize) -> Option<Self> {
        DEPTH.with(|d| {
            if d.get() >= max_depth {
                None
            } else {
                d.set(d.get() + 1);
                Some(DepthScope)
            }
        })
    }
}

impl Drop for DepthScope {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
