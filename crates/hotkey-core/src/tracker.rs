//! The modifier/chord state machine.
//!
//! [`ChordTracker`] consumes normalized press and release events and decides
//! when a gesture is complete. The same machine serves live dispatch and
//! interactive chord recording; only the completion rule differs.
//!
//! # State
//!
//! | Set                     | Holds                                                |
//! |-------------------------|------------------------------------------------------|
//! | `active_modifiers`      | modifiers physically held right now                  |
//! | `sticky_modifiers`      | modifiers pressed during the current gesture         |
//! | `pending_non_modifiers` | keys/buttons pressed during the current gesture      |
//! | `active_non_modifiers`  | keys/buttons physically held right now               |
//!
//! # Transitions
//!
//! - Press modifier: add to active and sticky; drop pending non-modifiers that
//!   are no longer held.
//! - Press non-modifier: add to pending and active; drop sticky modifiers that
//!   are no longer held.
//! - Release: remove from the matching active set. When no non-modifier is held
//!   any more the gesture is evaluated.
//!
//! Dropping only released tokens keeps chords order-independent: with
//! `ctrl alt y` held, releasing `ctrl` and `alt` before `y` still yields
//! `{ctrl, alt, y}`, while a modifier tapped before an unrelated key does not
//! leak into the next chord.
//!
//! In [`TrackerMode::Dispatch`] the candidate `active ∪ sticky ∪ pending` is
//! looked up in the registry; a match fully resets the tracker so the gesture
//! fires exactly once. A miss leaves the state alone. In
//! [`TrackerMode::Record`] the gesture completes once nothing at all is held
//! and the candidate itself is returned.
//!
//! The tracker does no locking and reads no clock; the caller owns both.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::action::HotkeyAction;
use crate::chord::Chord;
use crate::registry::ChordRegistry;
use crate::token::Token;

/// What a completed gesture produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerMode {
    /// Look the chord up and report the bound action.
    #[default]
    Dispatch,
    /// Report the chord itself once every key is released.
    Record,
}

/// Outcome of a release that completed a gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Matched(HotkeyAction),
    Recorded(Chord),
}

/// Sorted copy of the tracker's sets, for logging and assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerSnapshot {
    pub active_modifiers: Vec<Token>,
    pub sticky_modifiers: Vec<Token>,
    pub pending_non_modifiers: Vec<Token>,
    pub active_non_modifiers: Vec<Token>,
}

impl TrackerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.active_modifiers.is_empty()
            && self.sticky_modifiers.is_empty()
            && self.pending_non_modifiers.is_empty()
            && self.active_non_modifiers.is_empty()
    }
}

/// Press/release state machine. See the module docs for the rules.
#[derive(Debug, Default)]
pub struct ChordTracker {
    mode: TrackerMode,
    active_modifiers: HashSet<Token>,
    sticky_modifiers: HashSet<Token>,
    pending_non_modifiers: HashSet<Token>,
    active_non_modifiers: HashSet<Token>,
    last_activity: Option<Instant>,
}

impl ChordTracker {
    pub fn new(mode: TrackerMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> TrackerMode {
        self.mode
    }

    /// Switches mode and starts a fresh gesture.
    pub fn set_mode(&mut self, mode: TrackerMode) {
        self.mode = mode;
        self.reset();
    }

    /// Records a press of `token` at `now`.
    pub fn press(&mut self, token: Token, now: Instant) {
        if token.is_modifier() {
            let held = &self.active_non_modifiers;
            self.pending_non_modifiers.retain(|t| held.contains(t));
            self.active_modifiers.insert(token.clone());
            self.sticky_modifiers.insert(token);
        } else {
            let held = &self.active_modifiers;
            self.sticky_modifiers.retain(|t| held.contains(t));
            self.pending_non_modifiers.insert(token.clone());
            self.active_non_modifiers.insert(token);
        }
        self.last_activity = Some(now);
    }

    /// Records a release of `token` and evaluates the gesture if it is now
    /// complete.
    ///
    /// Returns `Some` at most once per gesture: every `Some` is preceded by a
    /// full reset of the tracker.
    pub fn release(&mut self, token: &Token, registry: &ChordRegistry) -> Option<Completion> {
        if token.is_modifier() {
            self.active_modifiers.remove(token);
        } else {
            self.active_non_modifiers.remove(token);
        }
        if !self.active_non_modifiers.is_empty() {
            return None;
        }

        match self.mode {
            TrackerMode::Dispatch => {
                let candidate = self.candidate();
                if candidate.is_empty() {
                    return None;
                }
                let action = registry.lookup(&candidate)?.clone();
                self.reset();
                Some(Completion::Matched(action))
            }
            TrackerMode::Record => {
                if !self.active_modifiers.is_empty() {
                    return None;
                }
                let candidate = self.candidate();
                if candidate.is_empty() {
                    return None;
                }
                self.reset();
                Some(Completion::Recorded(candidate))
            }
        }
    }

    /// The chord the current gesture would complete with.
    pub fn candidate(&self) -> Chord {
        self.active_modifiers
            .iter()
            .chain(&self.sticky_modifiers)
            .chain(&self.pending_non_modifiers)
            .collect()
    }

    /// Clears all four sets. The mode and activity timestamp are kept.
    pub fn reset(&mut self) {
        self.active_modifiers.clear();
        self.sticky_modifiers.clear();
        self.pending_non_modifiers.clear();
        self.active_non_modifiers.clear();
    }

    /// `true` when no gesture is in progress.
    pub fn is_idle(&self) -> bool {
        self.active_modifiers.is_empty()
            && self.sticky_modifiers.is_empty()
            && self.pending_non_modifiers.is_empty()
            && self.active_non_modifiers.is_empty()
    }

    /// Time since the last press, or `None` if nothing was ever pressed.
    pub fn idle_for(&self, now: Instant) -> Option<Duration> {
        self.last_activity
            .map(|last| now.saturating_duration_since(last))
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        fn sorted(set: &HashSet<Token>) -> Vec<Token> {
            let mut v: Vec<Token> = set.iter().cloned().collect();
            v.sort();
            v
        }
        TrackerSnapshot {
            active_modifiers: sorted(&self.active_modifiers),
            sticky_modifiers: sorted(&self.sticky_modifiers),
            pending_non_modifiers: sorted(&self.pending_non_modifiers),
            active_non_modifiers: sorted(&self.active_non_modifiers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BindingSpec, DuplicatePolicy};

    fn t(name: &str) -> Token {
        Token::from_name(name).unwrap()
    }

    fn registry(bindings: &[(&str, &str)]) -> ChordRegistry {
        let specs: Vec<BindingSpec> = bindings
            .iter()
            .map(|(hotkey, id)| BindingSpec::new(*id, *hotkey, true))
            .collect();
        ChordRegistry::build(&specs, DuplicatePolicy::Reject).unwrap()
    }

    fn matched(id: &str) -> Option<Completion> {
        Some(Completion::Matched(HotkeyAction::from_id(id)))
    }

    #[test]
    fn test_scenario_ctrl_alt_y_fires_once_on_release() {
        // Arrange
        let reg = registry(&[("ctrl alt y", "A1")]);
        let mut tracker = ChordTracker::new(TrackerMode::Dispatch);
        let now = Instant::now();

        // Act
        tracker.press(t("ctrl"), now);
        tracker.press(t("alt"), now);
        tracker.press(t("y"), now);
        let first = tracker.release(&t("y"), &reg);

        // Assert
        assert_eq!(first, matched("A1"));
        assert!(tracker.is_idle());

        // The still-held modifiers come back up without firing again.
        assert_eq!(tracker.release(&t("alt"), &reg), None);
        assert_eq!(tracker.release(&t("ctrl"), &reg), None);

        // A bare `y` is a different chord.
        tracker.press(t("y"), now);
        assert_eq!(tracker.release(&t("y"), &reg), None);
    }

    #[test]
    fn test_modifiers_released_before_key_still_match() {
        let reg = registry(&[("ctrl alt y", "A1")]);
        let mut tracker = ChordTracker::default();
        let now = Instant::now();

        tracker.press(t("ctrl"), now);
        tracker.press(t("alt"), now);
        tracker.press(t("y"), now);
        assert_eq!(tracker.release(&t("ctrl"), &reg), None);
        assert_eq!(tracker.release(&t("alt"), &reg), None);

        assert_eq!(tracker.release(&t("y"), &reg), matched("A1"));
    }

    #[test]
    fn test_key_pressed_before_modifiers_still_matches() {
        let reg = registry(&[("ctrl alt y", "A1")]);
        let mut tracker = ChordTracker::default();
        let now = Instant::now();

        tracker.press(t("y"), now);
        tracker.press(t("alt"), now);
        tracker.press(t("ctrl"), now);

        assert_eq!(tracker.release(&t("y"), &reg), matched("A1"));
    }

    #[test]
    fn test_modifiers_alone_never_fire() {
        // Arrange
        let reg = registry(&[("ctrl alt y", "A1")]);
        let mut tracker = ChordTracker::default();
        let now = Instant::now();

        // Act
        tracker.press(t("ctrl"), now);
        tracker.press(t("alt"), now);
        let r1 = tracker.release(&t("alt"), &reg);
        let r2 = tracker.release(&t("ctrl"), &reg);

        // Assert
        assert_eq!(r1, None);
        assert_eq!(r2, None);
    }

    #[test]
    fn test_no_fire_while_another_non_modifier_is_held() {
        let reg = registry(&[("ctrl y", "A1"), ("ctrl y z", "A2")]);
        let mut tracker = ChordTracker::default();
        let now = Instant::now();

        tracker.press(t("ctrl"), now);
        tracker.press(t("y"), now);
        tracker.press(t("z"), now);
        assert_eq!(tracker.release(&t("y"), &reg), None);

        assert_eq!(tracker.release(&t("z"), &reg), matched("A2"));
    }

    #[test]
    fn test_unmatched_release_leaves_state() {
        let reg = registry(&[("ctrl alt y", "A1")]);
        let mut tracker = ChordTracker::default();
        let now = Instant::now();

        tracker.press(t("ctrl"), now);
        tracker.press(t("q"), now);
        assert_eq!(tracker.release(&t("q"), &reg), None);

        let snap = tracker.snapshot();
        assert_eq!(snap.active_modifiers, vec![t("ctrl")]);
        assert_eq!(snap.sticky_modifiers, vec![t("ctrl")]);
        assert_eq!(snap.pending_non_modifiers, vec![t("q")]);
        assert!(snap.active_non_modifiers.is_empty());
    }

    #[test]
    fn test_modifier_press_drops_released_pending_keys() {
        let reg = registry(&[("ctrl alt y", "A1")]);
        let mut tracker = ChordTracker::default();
        let now = Instant::now();

        // A stray `q` typed earlier must not poison the next chord.
        tracker.press(t("q"), now);
        tracker.release(&t("q"), &reg);
        tracker.press(t("ctrl"), now);
        tracker.press(t("alt"), now);
        tracker.press(t("y"), now);

        assert_eq!(tracker.release(&t("y"), &reg), matched("A1"));
    }

    #[test]
    fn test_key_press_drops_released_sticky_modifiers() {
        let reg = registry(&[("y", "Bare"), ("shift y", "Shifted")]);
        let mut tracker = ChordTracker::default();
        let now = Instant::now();

        tracker.press(t("shift"), now);
        tracker.release(&t("shift"), &reg);
        tracker.press(t("y"), now);

        assert_eq!(tracker.release(&t("y"), &reg), matched("Bare"));
    }

    #[test]
    fn test_mouse_button_is_a_non_modifier() {
        let reg = registry(&[("ctrl mouse_left", "Click")]);
        let mut tracker = ChordTracker::default();
        let now = Instant::now();

        tracker.press(t("ctrl"), now);
        tracker.press(t("mouse_left"), now);

        assert_eq!(tracker.release(&t("mouse_left"), &reg), matched("Click"));
    }

    #[test]
    fn test_mouse_button_held_blocks_keyboard_completion() {
        let reg = registry(&[("ctrl y", "A1"), ("ctrl mouse_left y", "A2")]);
        let mut tracker = ChordTracker::default();
        let now = Instant::now();

        tracker.press(t("ctrl"), now);
        tracker.press(t("mouse_left"), now);
        tracker.press(t("y"), now);
        assert_eq!(tracker.release(&t("y"), &reg), None);

        assert_eq!(tracker.release(&t("mouse_left"), &reg), matched("A2"));
    }

    #[test]
    fn test_repeated_press_events_are_idempotent() {
        let reg = registry(&[("ctrl y", "A1")]);
        let mut tracker = ChordTracker::default();
        let now = Instant::now();

        tracker.press(t("ctrl"), now);
        for _ in 0..5 {
            tracker.press(t("y"), now);
        }

        assert_eq!(tracker.release(&t("y"), &reg), matched("A1"));
        assert_eq!(tracker.release(&t("y"), &reg), None);
    }

    #[test]
    fn test_release_without_press_is_harmless() {
        let reg = registry(&[("ctrl y", "A1")]);
        let mut tracker = ChordTracker::default();

        assert_eq!(tracker.release(&t("y"), &reg), None);
        assert_eq!(tracker.release(&t("ctrl"), &reg), None);
        assert!(tracker.is_idle());
    }

    #[test]
    fn test_record_mode_completes_when_everything_is_released() {
        // Arrange
        let reg = ChordRegistry::empty();
        let mut tracker = ChordTracker::new(TrackerMode::Record);
        let now = Instant::now();

        // Act
        tracker.press(t("ctrl"), now);
        tracker.press(t("shift"), now);
        tracker.press(t("k"), now);
        let after_key = tracker.release(&t("k"), &reg);
        let after_shift = tracker.release(&t("shift"), &reg);
        let after_ctrl = tracker.release(&t("ctrl"), &reg);

        // Assert
        assert_eq!(after_key, None);
        assert_eq!(after_shift, None);
        assert_eq!(
            after_ctrl,
            Some(Completion::Recorded(Chord::parse("ctrl shift k").unwrap()))
        );
        assert!(tracker.is_idle());
    }

    #[test]
    fn test_record_mode_ignores_registry() {
        let reg = registry(&[("ctrl y", "A1")]);
        let mut tracker = ChordTracker::new(TrackerMode::Record);
        let now = Instant::now();

        tracker.press(t("ctrl"), now);
        tracker.press(t("y"), now);
        tracker.release(&t("y"), &reg);

        assert_eq!(
            tracker.release(&t("ctrl"), &reg),
            Some(Completion::Recorded(Chord::parse("ctrl y").unwrap()))
        );
    }

    #[test]
    fn test_set_mode_resets_gesture() {
        let mut tracker = ChordTracker::default();
        tracker.press(t("ctrl"), Instant::now());

        tracker.set_mode(TrackerMode::Record);

        assert!(tracker.is_idle());
        assert_eq!(tracker.mode(), TrackerMode::Record);
    }

    #[test]
    fn test_idle_for_measures_since_last_press() {
        let mut tracker = ChordTracker::default();
        let start = Instant::now();
        assert_eq!(tracker.idle_for(start), None);

        tracker.press(t("a"), start);

        assert_eq!(
            tracker.idle_for(start + Duration::from_secs(31)),
            Some(Duration::from_secs(31))
        );
    }

    #[test]
    fn test_reset_clears_every_set() {
        let mut tracker = ChordTracker::default();
        let now = Instant::now();
        tracker.press(t("ctrl"), now);
        tracker.press(t("a"), now);

        tracker.reset();

        assert!(tracker.snapshot().is_empty());
        assert!(tracker.candidate().is_empty());
    }
}
