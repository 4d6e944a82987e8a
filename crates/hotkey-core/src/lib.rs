//! # hotkey-core
//!
//! Pure chord-matching logic for the system-wide hotkey engine: key
//! normalization tables, chord parsing, the chord registry, the typed action
//! model, and the press/release state machine that decides when a chord is
//! complete.
//!
//! This crate has zero dependencies on OS APIs or threads. The daemon crate
//! feeds it normalized events from the input hooks and owns all locking.
//!
//! # Architecture overview
//!
//! ```text
//! raw key / button ──► keymap (Token) ──► ChordTracker ──► ChordRegistry lookup
//!                                              │
//!                                              └──► Completion::Matched(HotkeyAction)
//!                                                   Completion::Recorded(Chord)
//! ```
//!
//! - **`token`** – canonical, side-collapsed, case-normalized key names.
//! - **`keymap`** – translation from platform key codes, characters and mouse
//!   buttons to tokens (and token → Windows VK for synthetic release).
//! - **`chord`** – unordered token sets and their textual form (`"ctrl alt y"`).
//! - **`action`** – what a binding triggers, resolved once at registry build.
//! - **`registry`** – the `Chord → HotkeyAction` map built from bindings.
//! - **`tracker`** – the modifier/chord state machine shared by live dispatch
//!   and chord recording.

pub mod action;
pub mod chord;
pub mod keymap;
pub mod registry;
pub mod token;
pub mod tracker;

pub use action::{HotkeyAction, SystemAction};
pub use chord::{Chord, ChordParseError};
pub use keymap::{KeyMapper, MouseButton, RawKey};
pub use registry::{BindingSpec, ChordRegistry, DuplicatePolicy, HotkeyBinding, RegistryError};
pub use token::Token;
pub use tracker::{ChordTracker, Completion, TrackerMode, TrackerSnapshot};
