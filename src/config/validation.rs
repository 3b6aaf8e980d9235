//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use super::ignore::NAME_PLACEHOLDER;
use crate::handlers::whisper::WHISPER_ALIASES;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("database.path must not be empty")]
    EmptyDatabasePath,
    #[error("ignore.blocked_commands entry must start with '/', got '{0}'")]
    InvalidBlockedCommand(String),
    #[error("ignore.blocked_commands entry '{0}' is not a whisper command")]
    UnknownBlockedCommand(String),
    #[error("ignore.ignore_message must not be empty")]
    EmptyIgnoreMessage,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    if let Some(ref db) = config.database
        && db.path.trim().is_empty()
    {
        errors.push(ValidationError::EmptyDatabasePath);
    }

    for command in &config.ignore.blocked_commands {
        if !command.starts_with('/') || command.len() < 2 || command.contains(' ') {
            errors.push(ValidationError::InvalidBlockedCommand(command.clone()));
        } else if !WHISPER_ALIASES
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(command))
        {
            errors.push(ValidationError::UnknownBlockedCommand(command.clone()));
        }
    }

    if config.ignore.ignore_message.trim().is_empty() {
        errors.push(ValidationError::EmptyIgnoreMessage);
    } else if !config.ignore.ignore_message.contains(NAME_PLACEHOLDER) {
        tracing::warn!(
            template = %config.ignore.ignore_message,
            "ignore.ignore_message has no {{name}} placeholder"
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
