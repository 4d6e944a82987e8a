//! Chords: unordered sets of tokens.
//!
//! Two chords are equal iff their token sets are equal, so `"ctrl alt y"` and
//! `"Y alt ctrl_r"` describe the same chord. A [`BTreeSet`] backs the chord so
//! it hashes and compares by content and iterates deterministically.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::keymap::KeyMapper;
use crate::token::Token;

/// Error returned when a chord string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordParseError {
    #[error("chord is empty")]
    Empty,
    #[error("unknown key token {0:?}")]
    UnknownToken(String),
}

/// An unordered set of unique tokens that must all be held to trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Chord(BTreeSet<Token>);

impl Chord {
    /// Parses a whitespace-separated chord string such as `"ctrl alt y"`.
    ///
    /// Tokens are case-folded and side-collapsed; duplicates merge.
    ///
    /// # Errors
    ///
    /// Returns [`ChordParseError::Empty`] for a blank string and
    /// [`ChordParseError::UnknownToken`] for a name no input can produce.
    pub fn parse(text: &str) -> Result<Self, ChordParseError> {
        let mut tokens = BTreeSet::new();
        for part in text.split_whitespace() {
            let token = Token::from_name(part)
                .filter(KeyMapper::is_known_token)
                .ok_or_else(|| ChordParseError::UnknownToken(part.to_string()))?;
            tokens.insert(token);
        }
        if tokens.is_empty() {
            return Err(ChordParseError::Empty);
        }
        Ok(Self(tokens))
    }

    /// Number of tokens in the chord.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.0.iter()
    }

    /// Tokens in display order: `ctrl` first, then the remaining modifiers,
    /// then everything else alphabetically.
    pub fn display_order(&self) -> Vec<&Token> {
        let mut ordered: Vec<&Token> = self.0.iter().collect();
        ordered.sort_by_key(|t| (t.as_str() != "ctrl", !t.is_modifier(), t.as_str()));
        ordered
    }
}

impl FromIterator<Token> for Chord {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a Token> for Chord {
    fn from_iter<I: IntoIterator<Item = &'a Token>>(iter: I) -> Self {
        Self(iter.into_iter().cloned().collect())
    }
}

impl FromStr for Chord {
    type Err = ChordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for token in self.display_order() {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(token.as_str())?;
            first = false;
        }
        Ok(())
    }
}
