//! What a binding triggers.
//!
//! Action ids arrive as plain strings from configuration. Ids naming one of the
//! built-in windows resolve to [`SystemAction`]; any other id is an opaque
//! user prompt. Resolution happens once, when the registry is built, so the
//! dispatch path never compares strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Built-in actions handled by the host application itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemAction {
    /// Bring the chat window to the front.
    ChatWindow,
    /// Open the settings window.
    SettingsWindow,
    /// Show the prompt selector menu at the cursor.
    PromptSelector,
}

impl SystemAction {
    pub const ALL: [SystemAction; 3] = [
        SystemAction::ChatWindow,
        SystemAction::SettingsWindow,
        SystemAction::PromptSelector,
    ];

    /// The configuration id for this action.
    pub fn id(self) -> &'static str {
        match self {
            SystemAction::ChatWindow => "chat_window",
            SystemAction::SettingsWindow => "settings_window",
            SystemAction::PromptSelector => "prompt_selector",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.id() == id)
    }
}

/// A resolved binding target handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HotkeyAction {
    System(SystemAction),
    /// A user prompt, identified by its configured name.
    Prompt(String),
}

impl HotkeyAction {
    /// Resolves an action id.
    pub fn from_id(id: &str) -> Self {
        match SystemAction::from_id(id) {
            Some(system) => HotkeyAction::System(system),
            None => HotkeyAction::Prompt(id.to_string()),
        }
    }

    /// The action id this action was resolved from.
    pub fn id(&self) -> &str {
        match self {
            HotkeyAction::System(system) => system.id(),
            HotkeyAction::Prompt(id) => id,
        }
    }
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HotkeyAction::System(system) => write!(f, "system:{}", system.id()),
            HotkeyAction::Prompt(id) => write!(f, "prompt:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_ids_resolve_to_system_actions() {
        assert_eq!(
            HotkeyAction::from_id("chat_window"),
            HotkeyAction::System(SystemAction::ChatWindow)
        );
        assert_eq!(
            HotkeyAction::from_id("settings_window"),
            HotkeyAction::System(SystemAction::SettingsWindow)
        );
        assert_eq!(
            HotkeyAction::from_id("prompt_selector"),
            HotkeyAction::System(SystemAction::PromptSelector)
        );
    }

    #[test]
    fn test_other_ids_resolve_to_prompts() {
        assert_eq!(
            HotkeyAction::from_id("Proofread"),
            HotkeyAction::Prompt("Proofread".to_string())
        );
    }

    #[test]
    fn test_id_round_trips() {
        for id in ["chat_window", "More formal", "prompt_selector"] {
            assert_eq!(HotkeyAction::from_id(id).id(), id);
        }
    }

    #[test]
    fn test_display_tags_kind() {
        assert_eq!(
            HotkeyAction::from_id("chat_window").to_string(),
            "system:chat_window"
        );
        assert_eq!(HotkeyAction::from_id("Summarize").to_string(), "prompt:Summarize");
    }
}
