//! The chord registry: which chord triggers which action.
//!
//! A registry is immutable once built. Reloading builds a complete new
//! registry from the full binding list and the caller swaps it in whole, so a
//! lookup always sees either the old mapping or the new one, never a mix. A
//! failed build returns an error and leaves whatever the caller holds
//! untouched.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::action::HotkeyAction;
use crate::chord::{Chord, ChordParseError};

/// Errors produced while building a [`ChordRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("binding {id:?} has an invalid chord: {source}")]
    InvalidChord {
        id: String,
        #[source]
        source: ChordParseError,
    },
    #[error("chord \"{chord}\" is bound by both {first:?} and {second:?}")]
    DuplicateChord {
        chord: String,
        first: String,
        second: String,
    },
}

/// What to do when two enabled bindings share a chord.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the build; the previous registry stays live.
    #[default]
    Reject,
    /// Keep the binding that appears first in the list.
    FirstWins,
    /// Keep the binding that appears last in the list.
    LastWins,
}

/// A binding as it appears in configuration: an action id and a chord string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSpec {
    pub id: String,
    #[serde(default)]
    pub hotkey: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl BindingSpec {
    pub fn new(id: impl Into<String>, hotkey: impl Into<String>, enabled: bool) -> Self {
        Self {
            id: id.into(),
            hotkey: hotkey.into(),
            enabled,
        }
    }
}

/// A binding whose chord string has been parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub id: String,
    pub chord: Chord,
    pub enabled: bool,
}

impl HotkeyBinding {
    /// Parses the chord of `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidChord`] when the chord string is empty
    /// or names an unknown token.
    pub fn from_spec(spec: &BindingSpec) -> Result<Self, RegistryError> {
        let chord = Chord::parse(&spec.hotkey).map_err(|source| RegistryError::InvalidChord {
            id: spec.id.clone(),
            source,
        })?;
        Ok(Self {
            id: spec.id.clone(),
            chord,
            enabled: spec.enabled,
        })
    }

    pub fn action(&self) -> HotkeyAction {
        HotkeyAction::from_id(&self.id)
    }
}

/// Immutable `Chord → HotkeyAction` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChordRegistry {
    entries: HashMap<Chord, HotkeyAction>,
}

impl ChordRegistry {
    /// A registry with no bindings. Nothing ever matches.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a registry from the full binding list.
    ///
    /// Disabled bindings are ignored without parsing. Enabled bindings with a
    /// blank chord are skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidChord`] if an enabled binding's chord does
    ///   not parse.
    /// - [`RegistryError::DuplicateChord`] if two enabled bindings share a
    ///   chord and `policy` is [`DuplicatePolicy::Reject`].
    pub fn build(specs: &[BindingSpec], policy: DuplicatePolicy) -> Result<Self, RegistryError> {
        let mut entries: HashMap<Chord, HotkeyAction> = HashMap::with_capacity(specs.len());

        for spec in specs.iter().filter(|s| s.enabled) {
            if spec.hotkey.trim().is_empty() {
                warn!(id = %spec.id, "enabled binding has no chord; skipping");
                continue;
            }
            let binding = HotkeyBinding::from_spec(spec)?;
            let action = binding.action();

            match entries.entry(binding.chord) {
                Entry::Vacant(slot) => {
                    slot.insert(action);
                }
                Entry::Occupied(mut slot) => match policy {
                    DuplicatePolicy::Reject => {
                        return Err(RegistryError::DuplicateChord {
                            chord: slot.key().to_string(),
                            first: slot.get().id().to_string(),
                            second: spec.id.clone(),
                        });
                    }
                    DuplicatePolicy::FirstWins => {
                        warn!(
                            chord = %slot.key(),
                            kept = slot.get().id(),
                            dropped = %spec.id,
                            "duplicate chord; keeping first binding"
                        );
                    }
                    DuplicatePolicy::LastWins => {
                        warn!(
                            chord = %slot.key(),
                            kept = %spec.id,
                            dropped = slot.get().id(),
                            "duplicate chord; keeping last binding"
                        );
                        slot.insert(action);
                    }
                },
            }
        }

        debug!(bindings = entries.len(), "chord registry built");
        Ok(Self { entries })
    }

    /// Returns the action bound to `chord`, if any.
    pub fn lookup(&self, chord: &Chord) -> Option<&HotkeyAction> {
        self.entries.get(chord)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Chord, &HotkeyAction)> {
        self.entries.iter()
    }
}
