//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle another thread uses to stop a running execution context.
///
/// The context polls the flag on every loop iteration and `redo` restart.
#[derive(Clone, Debug, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request interruption. The context observes it at its next poll.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Consume a pending request, returning whether one was pending.
    #[inline]
    pub(crate) fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_consumed_once() {
        let handle = InterruptHandle::new();
        let remote = handle.clone();
        std::thread::spawn(move || remote.interrupt())
            .join()
            .ok();
        assert!(handle.is_pending());
        assert!(handle.take());
        assert!(!handle.take());
    }
}
