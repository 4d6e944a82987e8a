//! Mock key releaser for unit testing.
//!
//! Records every batch passed to [`KeyReleaser::release_keys`] so tests can
//! assert on exactly which keys were released and when.

use std::sync::Mutex;

use hotkey_core::Token;

use super::{KeyReleaser, ReleaseError};

/// A mock releaser that records all calls without performing OS API calls.
#[derive(Debug, Default)]
pub struct MockKeyReleaser {
    /// One entry per `release_keys` call.
    pub released: Mutex<Vec<Vec<Token>>>,
    /// When `true`, `release_keys` records the call and then fails.
    pub should_fail: bool,
}

impl MockKeyReleaser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Number of `release_keys` calls so far.
    pub fn call_count(&self) -> usize {
        self.released
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl KeyReleaser for MockKeyReleaser {
    fn release_keys(&self, tokens: &[Token]) -> Result<(), ReleaseError> {
        self.released
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tokens.to_vec());
        if self.should_fail {
            return Err(ReleaseError::Platform("mock failure".to_string()));
        }
        Ok(())
    }
}
