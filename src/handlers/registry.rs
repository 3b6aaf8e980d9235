//! Slash-command registry and dispatch.

use super::ignore::IgnoreCommand;
use super::whisper::{WHISPER_ALIASES, WhisperHandler};
use crate::error::{HandlerError, HandlerResult};
use crate::state::{Hub, Session};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{Instrument, Level, debug, span};

/// Everything a handler needs to serve one line.
pub struct Context<'a> {
    pub hub: &'a Hub,
    pub session: &'a Session,
    /// The raw line as received, without the line terminator.
    pub line: &'a str,
}

/// A slash command.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Run the command. `args` are the whitespace-separated words after the
    /// command name. Returned lines go back to the caller only.
    async fn handle(&self, ctx: &Context<'_>, command: &str, args: &[&str]) -> HandlerResult;
}

/// Registry of slash-command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Create a registry with every command registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        handlers.insert("/ignore", Box::new(IgnoreCommand));
        for alias in WHISPER_ALIASES {
            handlers.insert(alias, Box::new(WhisperHandler));
        }

        Self { handlers }
    }

    /// Route a slash-command line to its handler.
    pub async fn dispatch(&self, ctx: &Context<'_>) -> HandlerResult {
        let mut words = ctx.line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Vec::new());
        };
        let args: Vec<&str> = words.collect();
        let name = command.to_lowercase();

        let Some((&key, handler)) = self.handlers.get_key_value(name.as_str()) else {
            return Err(HandlerError::UnknownCommand(command.to_string()));
        };

        let command_span = span!(
            Level::DEBUG,
            "chat.command",
            command = key,
            user = %ctx.session.name,
        );

        let result = handler.handle(ctx, key, &args).instrument(command_span).await;
        if let Err(ref e) = result {
            debug!(command = key, user = %ctx.session.name, code = e.error_code(), "Command failed");
        }
        result
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
