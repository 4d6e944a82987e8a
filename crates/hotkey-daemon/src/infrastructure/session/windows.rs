//! Windows session-lock detector.
//!
//! `GetForegroundWindow` returns null while the secure desktop is active,
//! which covers the lock screen, Ctrl+Alt+Del and elevation prompts.

#![cfg(target_os = "windows")]

use windows::Win32::UI::WindowsAndMessaging::GetForegroundWindow;

use super::LockDetector;

/// Windows implementation of [`LockDetector`].
#[derive(Debug, Default)]
pub struct ForegroundWindowDetector;

impl ForegroundWindowDetector {
    pub fn new() -> Self {
        Self
    }
}

impl LockDetector for ForegroundWindowDetector {
    fn is_locked(&self) -> bool {
        // SAFETY: GetForegroundWindow has no preconditions.
        let hwnd = unsafe { GetForegroundWindow() };
        hwnd.is_invalid()
    }
}
