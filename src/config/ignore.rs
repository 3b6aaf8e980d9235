//! Ignore feature configuration.

use crate::handlers::whisper::WHISPER_ALIASES;
use serde::Deserialize;

/// Placeholder replaced with the target's display name in [`IgnoreConfig::ignore_message`].
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Settings for whisper blocking.
#[derive(Debug, Clone, Deserialize)]
pub struct IgnoreConfig {
    /// Refuse whispers to users who ignore the sender (default: true).
    #[serde(default = "default_true")]
    pub block_private_messages: bool,
    /// Whisper command prefixes subject to blocking, e.g. "/msg".
    /// Matched case-insensitively.
    #[serde(default = "default_blocked_commands")]
    pub blocked_commands: Vec<String>,
    /// Reply sent to a blocked whisperer. `{name}` becomes the target's name.
    #[serde(default = "default_ignore_message")]
    pub ignore_message: String,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            block_private_messages: default_true(),
            blocked_commands: default_blocked_commands(),
            ignore_message: default_ignore_message(),
        }
    }
}

impl IgnoreConfig {
    /// Whether `command` (including its leading slash) is a blocked whisper command.
    pub fn is_blocked_command(&self, command: &str) -> bool {
        self.blocked_commands
            .iter()
            .any(|c| c.eq_ignore_ascii_case(command))
    }

    /// Render the blocked-whisper reply for `target_name`.
    pub fn ignore_message(&self, target_name: &str) -> String {
        self.ignore_message.replace(NAME_PLACEHOLDER, target_name)
    }
}

fn default_true() -> bool {
    true
}

fn default_blocked_commands() -> Vec<String> {
    WHISPER_ALIASES.into_iter().map(String::from).collect()
}

fn default_ignore_message() -> String {
    "You cannot send private messages to {name} because they are ignoring you.".to_string()
}
