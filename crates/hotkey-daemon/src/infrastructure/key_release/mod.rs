//! Synthetic key release.
//!
//! When the listeners stop while the user is holding a chord, the OS can be
//! left believing a modifier is still down (the release happened after the
//! hook was removed, or was lost across a session lock). On shutdown the
//! engine sends a synthetic key-up for each of [`RELEASE_ON_STOP`] through a
//! [`KeyReleaser`].

use hotkey_core::Token;
use thiserror::Error;

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Keys released on stop.
pub const RELEASE_ON_STOP: [&str; 5] = ["ctrl", "alt", "shift", "cmd", "esc"];

/// Error type for synthetic key release.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("no virtual key for token {0:?}")]
    UnmappedToken(String),
    #[error("platform error: {0}")]
    Platform(String),
}

/// Platform-agnostic synthetic key-up injection.
pub trait KeyReleaser: Send + Sync {
    /// Sends one key-up per token, in order.
    fn release_keys(&self, tokens: &[Token]) -> Result<(), ReleaseError>;
}

/// The tokens in [`RELEASE_ON_STOP`].
pub fn release_on_stop_tokens() -> Vec<Token> {
    RELEASE_ON_STOP
        .iter()
        .filter_map(|name| Token::from_name(name))
        .collect()
}

/// A releaser that does nothing, for platforms without synthetic input.
#[derive(Debug, Default)]
pub struct NoopKeyReleaser;

impl KeyReleaser for NoopKeyReleaser {
    fn release_keys(&self, _tokens: &[Token]) -> Result<(), ReleaseError> {
        Ok(())
    }
}
