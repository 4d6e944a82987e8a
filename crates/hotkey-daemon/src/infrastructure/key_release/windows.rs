//! Windows synthetic key release via the SendInput API.

#![cfg(target_os = "windows")]

use hotkey_core::{KeyMapper, Token};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, VIRTUAL_KEY,
};

use super::{KeyReleaser, ReleaseError};

/// VKs that need `KEYEVENTF_EXTENDEDKEY`.
const EXTENDED_VKS: &[u8] = &[
    0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, // nav
    0x2D, 0x2E, // Insert, Delete
    0x5B, 0x5C, // Win keys
    0xA3, 0xA5, // Right Ctrl, Right Alt
];

/// Windows implementation of [`KeyReleaser`] using SendInput.
#[derive(Debug, Default)]
pub struct WindowsKeyReleaser;

impl WindowsKeyReleaser {
    pub fn new() -> Self {
        Self
    }
}

impl KeyReleaser for WindowsKeyReleaser {
    fn release_keys(&self, tokens: &[Token]) -> Result<(), ReleaseError> {
        let inputs = tokens
            .iter()
            .map(|token| {
                KeyMapper::token_to_windows_vk(token)
                    .map(key_up_input)
                    .ok_or_else(|| ReleaseError::UnmappedToken(token.to_string()))
            })
            .collect::<Result<Vec<INPUT>, _>>()?;
        if inputs.is_empty() {
            return Ok(());
        }

        // SAFETY: inputs is a valid slice of keyboard INPUT structures.
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(ReleaseError::Platform(format!(
                "SendInput injected {sent} of {} events",
                inputs.len()
            )));
        }
        Ok(())
    }
}

fn key_up_input(vk: u8) -> INPUT {
    let mut flags: KEYBD_EVENT_FLAGS = KEYEVENTF_KEYUP;
    if EXTENDED_VKS.contains(&vk) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk as u16),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}
