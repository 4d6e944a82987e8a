//! Session-lock detection.
//!
//! While the workstation is locked the secure desktop owns input and release
//! events for keys held at lock time never reach the hooks. The health monitor
//! polls a [`LockDetector`] and resets the chord tracker whenever the session
//! is, or just was, locked.

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Reports whether the interactive session is currently locked.
pub trait LockDetector: Send + Sync {
    /// `true` when no foreground window is reachable (locked session, secure
    /// desktop, or UAC prompt).
    fn is_locked(&self) -> bool;
}

/// A detector that never reports a lock, for platforms without a native detector.
#[derive(Debug, Default)]
pub struct NeverLocked;

impl LockDetector for NeverLocked {
    fn is_locked(&self) -> bool {
        false
    }
}
