//! Input capture infrastructure for the hotkey daemon.
//!
//! On Windows, this installs a low-level keyboard hook (`WH_KEYBOARD_LL`) and a
//! low-level mouse hook (`WH_MOUSE_LL`), each on its own Win32 message-loop
//! thread, so that a dead keyboard hook can be detected and reinstalled
//! without touching the mouse hook and vice versa.
//!
//! # Hook callbacks
//!
//! Windows silently removes a low-level hook whose callback takes longer than
//! `LowLevelHooksTimeout` (around 300ms, less on recent builds). The callback
//! therefore does nothing but build a [`RawInputEvent`] and hand it to the
//! [`EventSink`], which normalizes the key and updates the chord tracker under
//! a short lock. Events are never swallowed: every callback forwards to
//! `CallNextHookEx`.
//!
//! # Testability
//!
//! The [`InputHook`] trait allows tests to inject synthetic events and kill a
//! hook on demand via [`mock::MockInputHook`].

use std::fmt;
use std::sync::Arc;

use hotkey_core::{MouseButton, RawKey};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// A raw input event produced by an input hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInputEvent {
    /// A key was pressed down. Auto-repeat produces further `KeyDown`s.
    KeyDown {
        key: RawKey,
        /// Milliseconds since system start (from the hook struct).
        time_ms: u32,
    },
    /// A key was released.
    KeyUp { key: RawKey, time_ms: u32 },
    /// A mouse button was pressed.
    MouseButtonDown {
        button: MouseButton,
        /// Screen coordinates; carried for logging only.
        x: i32,
        y: i32,
        time_ms: u32,
    },
    /// A mouse button was released.
    MouseButtonUp {
        button: MouseButton,
        x: i32,
        y: i32,
        time_ms: u32,
    },
}

/// Callback invoked on the hook thread for every captured event.
pub type EventSink = Arc<dyn Fn(RawInputEvent) + Send + Sync>;

/// Which device a hook observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Keyboard,
    Mouse,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Keyboard => f.write_str("keyboard"),
            HookKind::Mouse => f.write_str("mouse"),
        }
    }
}

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to install keyboard hook: {0}")]
    KeyboardHookInstallFailed(String),
    #[error("failed to install mouse hook: {0}")]
    MouseHookInstallFailed(String),
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

impl CaptureError {
    /// The install-failure variant for `kind`.
    pub fn install_failed(kind: HookKind, reason: impl Into<String>) -> Self {
        match kind {
            HookKind::Keyboard => CaptureError::KeyboardHookInstallFailed(reason.into()),
            HookKind::Mouse => CaptureError::MouseHookInstallFailed(reason.into()),
        }
    }
}

/// Trait abstracting one OS input hook.
///
/// The production implementation uses Windows hooks; tests use
/// [`mock::MockInputHook`].
pub trait InputHook: Send + Sync {
    /// The device this hook observes.
    fn kind(&self) -> HookKind;

    /// Installs the hook and starts delivering events to `sink`.
    ///
    /// Returns once the OS has accepted or refused the hook. Installing an
    /// already-installed hook replaces it.
    fn install(&self, sink: EventSink) -> Result<(), CaptureError>;

    /// Removes the hook and joins its thread. A no-op when not installed.
    fn uninstall(&self);

    /// `true` while the hook thread is running and the hook is registered.
    fn is_alive(&self) -> bool;
}

/// A hook that refuses to install, used on platforms without a native
/// implementation.
pub struct UnsupportedHook {
    kind: HookKind,
}

impl UnsupportedHook {
    pub fn new(kind: HookKind) -> Self {
        Self { kind }
    }
}

impl InputHook for UnsupportedHook {
    fn kind(&self) -> HookKind {
        self.kind
    }

    fn install(&self, _sink: EventSink) -> Result<(), CaptureError> {
        Err(CaptureError::UnsupportedPlatform(format!(
            "no {} hook for {}",
            self.kind,
            std::env::consts::OS
        )))
    }

    fn uninstall(&self) {}

    fn is_alive(&self) -> bool {
        false
    }
}
