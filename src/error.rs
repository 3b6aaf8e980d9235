//! Unified error handling for ignored.
//!
//! Storage errors live in [`crate::db::DbError`]; this module wraps them for
//! the ignore service and adds the input errors the command surface reports
//! back to users.

use crate::db::DbError;
use thiserror::Error;

// ============================================================================
// Service Errors (ignore relation operations)
// ============================================================================

/// Errors returned by ignore service mutations and strict queries.
#[derive(Debug, Error)]
pub enum IgnoreError {
    #[error("ignore store unavailable: {0}")]
    Store(#[from] DbError),
}

impl IgnoreError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Store(DbError::Sqlx(_)) => "store_query",
            Self::Store(DbError::Migration(_)) => "store_migration",
            Self::Store(DbError::Internal(_)) => "store_internal",
        }
    }
}

/// Outcome of removing a single ignore relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The relation existed and is gone.
    Removed,
    /// There was nothing to remove.
    NotIgnored,
}

// ============================================================================
// Connect Errors (login)
// ============================================================================

/// Reasons a login is refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("invalid name")]
    InvalidName,

    #[error("name already in use")]
    NameInUse,
}

// ============================================================================
// Handler Errors (command input)
// ============================================================================

/// Errors from user-typed commands.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("cannot ignore yourself")]
    SelfIgnore,

    #[error("no such user: {0}")]
    NoSuchUser(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error(transparent)]
    Ignore(#[from] IgnoreError),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SelfIgnore => "self_ignore",
            Self::NoSuchUser(_) => "no_such_user",
            Self::UnknownCommand(_) => "unknown_command",
            Self::Ignore(e) => e.error_code(),
        }
    }

    /// Text shown to the user who typed the command.
    pub fn to_reply(&self) -> String {
        match self {
            Self::SelfIgnore => "You cannot ignore yourself!".to_string(),
            Self::NoSuchUser(name) => format!("No such user: {}", name),
            Self::UnknownCommand(cmd) => format!("Unknown command: {}", cmd),
            // Storage details stay in the log.
            Self::Ignore(_) => "Your ignore list could not be updated, try again later.".to_string(),
        }
    }
}

/// Result type for command handlers.
pub type HandlerResult<T = Vec<String>> = Result<T, HandlerError>;
