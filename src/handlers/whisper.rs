//! Private messages and the whisper filter.
//!
//! A whisper to someone who ignores the sender is refused with the
//! configured message, as long as the alias used is one of the configured
//! `blocked_commands`.

use super::registry::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::state::Hub;
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

/// Every alias the gateway accepts for a private message.
pub const WHISPER_ALIASES: [&str; 8] = ["/w", "/whisper", "/msg", "/message", "/tell", "/pm", "/t", "/m"];

/// Outcome of the whisper filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhisperVerdict {
    Allow,
    /// Refused; the string is the reply for the sender.
    Blocked(String),
}

/// Decide whether the whisper `line` from `sender` may go through.
///
/// Only lines of the form `<command> <target> <message...>` are looked at.
/// Unknown or offline targets and whispers to oneself are let through, so
/// the command itself reports them.
pub async fn check(hub: &Hub, sender: Uuid, line: &str) -> WhisperVerdict {
    let settings = &hub.config.ignore;
    if !settings.block_private_messages {
        return WhisperVerdict::Allow;
    }

    let args: Vec<&str> = line.split_whitespace().collect();
    if args.len() < 3 || !settings.is_blocked_command(args[0]) {
        return WhisperVerdict::Allow;
    }

    let Some(target) = hub.roster.find(args[1]) else {
        return WhisperVerdict::Allow;
    };
    if target == sender {
        return WhisperVerdict::Allow;
    }

    if hub.ignores.is_ignoring(target, sender).await {
        let name = hub.roster.name(&target).unwrap_or_else(|| args[1].to_string());
        debug!(%sender, %target, "Whisper blocked by ignore");
        WhisperVerdict::Blocked(settings.ignore_message(&name))
    } else {
        WhisperVerdict::Allow
    }
}

/// Handler for every whisper alias.
pub struct WhisperHandler;

#[async_trait]
impl Handler for WhisperHandler {
    async fn handle(&self, ctx: &Context<'_>, command: &str, args: &[&str]) -> HandlerResult {
        let [target_name, _, ..] = args else {
            return Ok(vec![format!("Usage: {} <user> <message>", command)]);
        };

        if let WhisperVerdict::Blocked(reply) = check(ctx.hub, ctx.session.id, ctx.line).await {
            return Ok(vec![reply]);
        }

        let Some(target) = ctx.hub.roster.find(target_name) else {
            return Err(HandlerError::NoSuchUser(target_name.to_string()));
        };

        let text = message_text(ctx.line);
        if !ctx
            .hub
            .roster
            .send(&target, format!("[whisper] {}: {}", ctx.session.name, text))
        {
            return Err(HandlerError::NoSuchUser(target_name.to_string()));
        }
        Ok(Vec::new())
    }
}

/// The message as typed: everything after the command and target words.
fn message_text(line: &str) -> &str {
    fn skip_word(s: &str) -> &str {
        s.trim_start()
            .split_once(char::is_whitespace)
            .map_or("", |(_, rest)| rest)
    }
    skip_word(skip_word(line)).trim()
}
