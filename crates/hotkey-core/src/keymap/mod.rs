//! Key and button normalization.
//!
//! Every raw input that reaches the engine passes through [`KeyMapper`] before
//! it touches shared state. The mapper is a set of pure functions over static
//! tables, so both hook threads can call it concurrently without locking.
//!
//! Unmappable input yields `None` and is silently dropped by the caller; it is
//! not an error.

pub mod shifted;
pub mod windows_vk;

use serde::{Deserialize, Serialize};

use crate::token::Token;

/// Mouse button identifier as reported by the mouse hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    /// Canonical token name for this button.
    pub fn token_name(self) -> &'static str {
        match self {
            MouseButton::Left => "mouse_left",
            MouseButton::Right => "mouse_right",
            MouseButton::Middle => "mouse_middle",
            MouseButton::X1 => "mouse_x1",
            MouseButton::X2 => "mouse_x2",
        }
    }
}

/// Token names produced by mouse buttons.
const MOUSE_TOKENS: [&str; 5] = [
    "mouse_left",
    "mouse_right",
    "mouse_middle",
    "mouse_x1",
    "mouse_x2",
];

/// A raw keyboard key as delivered by a platform hook.
///
/// Hooks report whatever they have: the Windows low-level hook always carries
/// a virtual key code, character-based sources carry a character, some carry
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawKey {
    /// Windows Virtual Key code, if known.
    pub vk: Option<u8>,
    /// Character the key produced, if known.
    pub ch: Option<char>,
}

impl RawKey {
    /// A key identified only by its virtual key code.
    pub fn vk(vk: u8) -> Self {
        Self { vk: Some(vk), ch: None }
    }

    /// A key identified only by the character it produced.
    pub fn char(ch: char) -> Self {
        Self { vk: None, ch: Some(ch) }
    }
}

/// Unified key mapper providing all translation directions.
pub struct KeyMapper;

impl KeyMapper {
    /// Normalizes a raw key to a token.
    ///
    /// Resolution order: a shifted character folds to its base character
    /// first; otherwise the virtual key code is looked up; otherwise a
    /// printable character is used as-is (lowercased). Control characters
    /// and unknown codes yield `None`.
    pub fn normalize_key(key: RawKey) -> Option<Token> {
        if let Some(base) = key.ch.and_then(shifted::unshift) {
            return Some(Self::char_token(base));
        }
        if let Some(vk) = key.vk {
            return windows_vk::vk_to_name(vk).map(Token::canonical);
        }
        match key.ch {
            Some(c) if !c.is_control() && !c.is_whitespace() => Some(Self::char_token(c)),
            _ => None,
        }
    }

    /// Normalizes a mouse button to a token. Every button has one.
    pub fn normalize_button(button: MouseButton) -> Token {
        Token::canonical(button.token_name())
    }

    /// Translates a Windows Virtual Key code to a token.
    pub fn windows_vk_to_token(vk: u8) -> Option<Token> {
        windows_vk::vk_to_name(vk).map(Token::canonical)
    }

    /// Translates a token to a Windows Virtual Key code.
    ///
    /// Returns `None` for mouse tokens and characters with no VK.
    pub fn token_to_windows_vk(token: &Token) -> Option<u8> {
        windows_vk::name_to_vk(token.as_str())
    }

    /// Returns `true` if `token` can be produced by some input.
    ///
    /// Single characters are always accepted because character-reporting
    /// sources can produce any of them.
    pub fn is_known_token(token: &Token) -> bool {
        let name = token.as_str();
        name.chars().count() == 1
            || MOUSE_TOKENS.contains(&name)
            || windows_vk::is_known_name(name)
    }

    fn char_token(c: char) -> Token {
        Token::canonical(&c.to_lowercase().collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(token: Option<Token>) -> Option<String> {
        token.map(|t| t.as_str().to_string())
    }

    #[test]
    fn test_vk_path_maps_letters_to_lowercase() {
        assert_eq!(name(KeyMapper::normalize_key(RawKey::vk(0x59))), Some("y".into()));
    }

    #[test]
    fn test_vk_path_collapses_left_and_right_ctrl() {
        let left = KeyMapper::normalize_key(RawKey::vk(0xA2));
        let right = KeyMapper::normalize_key(RawKey::vk(0xA3));
        assert_eq!(left, right);
        assert_eq!(name(left), Some("ctrl".into()));
    }

    #[test]
    fn test_shifted_character_folds_to_base() {
        assert_eq!(name(KeyMapper::normalize_key(RawKey::char('!'))), Some("1".into()));
    }

    #[test]
    fn test_shifted_character_wins_over_vk() {
        // Shift+1 reported with both the VK and the produced character.
        let key = RawKey { vk: Some(0x31), ch: Some('!') };
        assert_eq!(name(KeyMapper::normalize_key(key)), Some("1".into()));
    }

    #[test]
    fn test_uppercase_character_is_lowercased() {
        assert_eq!(name(KeyMapper::normalize_key(RawKey::char('Y'))), Some("y".into()));
        assert_eq!(name(KeyMapper::normalize_key(RawKey::char('Ä'))), Some("ä".into()));
    }

    #[test]
    fn test_control_character_without_vk_is_dropped() {
        // Ctrl+Y on some sources reports U+0019 and nothing else.
        assert_eq!(KeyMapper::normalize_key(RawKey::char('\u{19}')), None);
    }

    #[test]
    fn test_unknown_input_yields_none() {
        assert_eq!(KeyMapper::normalize_key(RawKey::default()), None);
        assert_eq!(KeyMapper::normalize_key(RawKey::vk(0xFF)), None);
    }

    #[test]
    fn test_mouse_buttons_normalize_to_mouse_tokens() {
        assert_eq!(KeyMapper::normalize_button(MouseButton::Left).as_str(), "mouse_left");
        assert_eq!(KeyMapper::normalize_button(MouseButton::X2).as_str(), "mouse_x2");
    }

    #[test]
    fn test_token_to_windows_vk_for_release_keys() {
        let ctrl = Token::from_name("ctrl").unwrap();
        assert_eq!(KeyMapper::token_to_windows_vk(&ctrl), Some(0x11));
        let left = Token::from_name("mouse_left").unwrap();
        assert_eq!(KeyMapper::token_to_windows_vk(&left), None);
    }

    #[test]
    fn test_is_known_token() {
        for known in ["a", "ß", "f12", "page_down", "mouse_middle", "ctrl", "num_5"] {
            let token = Token::from_name(known).unwrap();
            assert!(KeyMapper::is_known_token(&token), "{known} should be known");
        }
        for unknown in ["ctlr", "mouse_side", "f99"] {
            let token = Token::from_name(unknown).unwrap();
            assert!(!KeyMapper::is_known_token(&token), "{unknown} should be unknown");
        }
    }
}
