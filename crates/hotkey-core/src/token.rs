//! Canonical key tokens.
//!
//! A [`Token`] names one physical input: a keyboard key (`"a"`, `"f5"`,
//! `"ctrl"`) or a mouse button (`"mouse_left"`). Tokens are lowercase and
//! side-independent, so left and right Control both become `"ctrl"`.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The four modifier tokens. Everything else is a non-modifier.
pub const MODIFIERS: [&str; 4] = ["ctrl", "alt", "shift", "cmd"];

/// Canonical name of one key or mouse button.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Builds a token from user-facing text, applying case folding and the
    /// side/alias collapsing rules.
    ///
    /// Returns `None` for empty input or input containing whitespace.
    pub fn from_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return None;
        }
        let lower = trimmed.to_lowercase();
        let canonical = match lower.as_str() {
            "ctrl_l" | "ctrl_r" | "control" | "lctrl" | "rctrl" => "ctrl",
            "alt_l" | "alt_r" | "alt_gr" | "option" | "lalt" | "ralt" => "alt",
            "shift_l" | "shift_r" | "lshift" | "rshift" => "shift",
            "cmd_l" | "cmd_r" | "win" | "super" | "meta" | "command" => "cmd",
            "escape" => "esc",
            "return" => "enter",
            other => return Some(Self(other.to_string())),
        };
        Some(Self(canonical.to_string()))
    }

    /// Wraps an already-canonical name. Used by the key tables, whose entries
    /// are canonical by construction.
    pub(crate) fn canonical(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Returns `true` for `ctrl`, `alt`, `shift` and `cmd`.
    pub fn is_modifier(&self) -> bool {
        MODIFIERS.contains(&self.0.as_str())
    }

    /// Returns `true` for tokens produced by mouse buttons.
    pub fn is_mouse_button(&self) -> bool {
        self.0.starts_with("mouse_")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
