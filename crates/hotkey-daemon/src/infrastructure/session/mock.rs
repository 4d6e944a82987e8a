//! Mock session detector for unit testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::LockDetector;

/// A detector whose lock state is set by the test.
#[derive(Debug, Default)]
pub struct MockLockDetector {
    locked: AtomicBool,
    polls: AtomicUsize,
}

impl MockLockDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }

    /// Number of `is_locked` calls so far.
    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl LockDetector for MockLockDetector {
    fn is_locked(&self) -> bool {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.locked.load(Ordering::SeqCst)
    }
}
