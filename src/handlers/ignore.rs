//! The `/ignore` command.
//!
//! - `/ignore <user>` toggles the relation
//! - `/ignore list` shows the list with online status
//! - `/ignore clear` empties it
//! - `/ignore help` explains the feature
//! - `/ignore` alone prints usage
//!
//! A line ending in a tab asks for completions of the first argument instead.

use super::registry::{Context, Handler};
use crate::error::{HandlerError, HandlerResult, IgnoreError};
use crate::state::{Hub, user_id};
use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

const SUBCOMMANDS: [&str; 3] = ["list", "clear", "help"];

/// Handler for `/ignore`.
pub struct IgnoreCommand;

#[async_trait]
impl Handler for IgnoreCommand {
    async fn handle(&self, ctx: &Context<'_>, _command: &str, args: &[&str]) -> HandlerResult {
        let actor = ctx.session.id;

        if ctx.line.ends_with('\t') {
            return Ok(vec![completion_reply(ctx.hub, actor, args)]);
        }

        let Some(first) = args.first() else {
            return Ok(usage());
        };

        match first.to_lowercase().as_str() {
            "list" => Ok(list(ctx.hub, actor).await),
            "clear" => clear(ctx.hub, actor).await,
            "help" => Ok(help()),
            _ => toggle(ctx.hub, actor, first).await,
        }
    }
}

impl IgnoreCommand {
    /// Completions for the first argument: matching subcommands, then online
    /// users other than `actor`.
    pub fn complete(hub: &Hub, actor: Uuid, partial: &str) -> Vec<String> {
        let partial = partial.to_lowercase();
        let mut completions: Vec<String> = SUBCOMMANDS
            .iter()
            .filter(|sub| sub.starts_with(&partial))
            .map(|sub| sub.to_string())
            .collect();

        completions.extend(
            hub.roster
                .names_with_prefix(&partial)
                .into_iter()
                .filter(|name| user_id(name) != actor),
        );
        completions
    }
}

fn completion_reply(hub: &Hub, actor: Uuid, args: &[&str]) -> String {
    let completions = match args {
        [] => IgnoreCommand::complete(hub, actor, ""),
        [partial] => IgnoreCommand::complete(hub, actor, partial),
        _ => Vec::new(),
    };
    if completions.is_empty() {
        "COMPLETIONS".to_string()
    } else {
        format!("COMPLETIONS {}", completions.join(" "))
    }
}

/// Resolve `name` to an online user, else to a user this server has seen.
async fn resolve(hub: &Hub, name: &str) -> HandlerResult<(Uuid, String)> {
    if let Some(id) = hub.roster.find(name)
        && let Some(display) = hub.roster.name(&id)
    {
        return Ok((id, display));
    }

    let id = user_id(name);
    match hub.db.users().find(id).await {
        Ok(Some(known)) => Ok((id, known.name)),
        Ok(None) => Err(HandlerError::NoSuchUser(name.to_string())),
        Err(e) => {
            warn!(name, error = %e, "Known-user lookup failed");
            Err(IgnoreError::from(e).into())
        }
    }
}

async fn toggle(hub: &Hub, actor: Uuid, name: &str) -> HandlerResult {
    let (target, display) = resolve(hub, name).await?;
    if target == actor {
        return Err(HandlerError::SelfIgnore);
    }

    let now_ignoring = hub.ignores.toggle(actor, target).await?;
    info!(%actor, %target, now_ignoring, "Ignore toggled");

    Ok(vec![if now_ignoring {
        format!("Now ignoring {}. You will no longer see their messages.", display)
    } else {
        format!("No longer ignoring {}.", display)
    }])
}

async fn list(hub: &Hub, actor: Uuid) -> Vec<String> {
    let entries = hub.ignores.list_formatted(actor, &hub.roster).await;
    if entries.is_empty() {
        return vec![nobody_ignored()];
    }

    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(format!("Ignored users ({}):", entries.len()));
    lines.extend(entries);
    lines
}

async fn clear(hub: &Hub, actor: Uuid) -> HandlerResult {
    if hub.ignores.count(actor).await == 0 {
        return Ok(vec![nobody_ignored()]);
    }

    let removed = hub.ignores.clear(actor).await?;
    info!(%actor, removed, "Ignore list cleared");

    Ok(vec![format!(
        "Ignore list cleared. You are no longer ignoring {} {}.",
        removed,
        if removed == 1 { "user" } else { "users" }
    )])
}

fn nobody_ignored() -> String {
    "You are not ignoring anyone.".to_string()
}

fn usage() -> Vec<String> {
    vec![
        "Usage:".to_string(),
        "  /ignore <user> - Ignore or unignore a user".to_string(),
        "  /ignore list - Show your ignore list".to_string(),
        "  /ignore clear - Clear your ignore list".to_string(),
        "  /ignore help - Show help".to_string(),
    ]
}

fn help() -> Vec<String> {
    vec![
        "=== Ignore ===".to_string(),
        "Ignoring a user hides their chat messages and blocks their whispers to you.".to_string(),
        String::new(),
        "Commands:".to_string(),
        "  * /ignore <user> - Add or remove a user from your ignore list".to_string(),
        "  * /ignore list - See everyone you are ignoring".to_string(),
        "  * /ignore clear - Remove everyone from your ignore list".to_string(),
        String::new(),
        "==============".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Session, test_hub};
    use tokio::sync::mpsc;

    async fn run(hub: &Hub, session: &Session, line: &str) -> HandlerResult {
        let ctx = Context { hub, session, line };
        let args: Vec<&str> = line.split_whitespace().skip(1).collect();
        IgnoreCommand.handle(&ctx, "/ignore", &args).await
    }

    #[tokio::test]
    async fn toggle_on_and_off() {
        let hub = test_hub("").await;
        let (tx, _rx) = mpsc::channel(8);
        let alice = hub.connect("alice", tx.clone()).await.unwrap();
        let bob = hub.connect("Bob", tx).await.unwrap();

        let lines = run(&hub, &alice, "/ignore bob").await.unwrap();
        assert_eq!(lines, vec!["Now ignoring Bob. You will no longer see their messages."]);
        assert!(hub.ignores.is_ignoring(alice.id, bob.id).await);

        let lines = run(&hub, &alice, "/ignore BOB").await.unwrap();
        assert_eq!(lines, vec!["No longer ignoring Bob."]);
        assert!(!hub.ignores.is_ignoring(alice.id, bob.id).await);
    }

    #[tokio::test]
    async fn cannot_ignore_self_or_strangers() {
        let hub = test_hub("").await;
        let (tx, _rx) = mpsc::channel(8);
        let alice = hub.connect("alice", tx).await.unwrap();

        let err = run(&hub, &alice, "/ignore Alice").await.unwrap_err();
        assert!(matches!(err, HandlerError::SelfIgnore));
        assert_eq!(err.to_reply(), "You cannot ignore yourself!");

        let err = run(&hub, &alice, "/ignore nobody").await.unwrap_err();
        assert_eq!(err.to_reply(), "No such user: nobody");
        assert_eq!(hub.ignores.count(alice.id).await, 0);
    }

    #[tokio::test]
    async fn offline_known_users_can_be_toggled() {
        let hub = test_hub("").await;
        let (tx, _rx) = mpsc::channel(8);
        let alice = hub.connect("alice", tx.clone()).await.unwrap();
        let bob = hub.connect("Bob", tx).await.unwrap();
        let bob_id = bob.id;
        hub.disconnect(bob).await;

        let lines = run(&hub, &alice, "/ignore bob").await.unwrap();
        assert_eq!(lines, vec!["Now ignoring Bob. You will no longer see their messages."]);
        assert!(hub.ignores.is_ignoring(alice.id, bob_id).await);
    }

    #[tokio::test]
    async fn store_failure_is_not_reported_as_unknown_user() {
        let hub = test_hub("").await;
        let (tx, _rx) = mpsc::channel(8);
        let alice = hub.connect("alice", tx.clone()).await.unwrap();
        let bob = hub.connect("bob", tx).await.unwrap();
        hub.disconnect(bob).await;

        hub.db.close().await;

        let err = run(&hub, &alice, "/ignore bob").await.unwrap_err();
        assert!(matches!(err, HandlerError::Ignore(_)));
        assert_eq!(err.error_code(), "store_query");
        assert_eq!(
            err.to_reply(),
            "Your ignore list could not be updated, try again later."
        );
    }

    #[tokio::test]
    async fn list_and_clear() {
        let hub = test_hub("").await;
        let (tx, _rx) = mpsc::channel(8);
        let alice = hub.connect("alice", tx.clone()).await.unwrap();
        let _xavier = hub.connect("Xavier", tx.clone()).await.unwrap();
        let yara = hub.connect("yara", tx).await.unwrap();

        assert_eq!(
            run(&hub, &alice, "/ignore list").await.unwrap(),
            vec!["You are not ignoring anyone."]
        );

        run(&hub, &alice, "/ignore yara").await.unwrap();
        run(&hub, &alice, "/ignore xavier").await.unwrap();
        hub.disconnect(yara).await;

        assert_eq!(
            run(&hub, &alice, "/ignore list").await.unwrap(),
            vec!["Ignored users (2):", "Xavier [Online]", "yara [Offline]"]
        );

        assert_eq!(
            run(&hub, &alice, "/ignore clear").await.unwrap(),
            vec!["Ignore list cleared. You are no longer ignoring 2 users."]
        );
        assert_eq!(
            run(&hub, &alice, "/ignore clear").await.unwrap(),
            vec!["You are not ignoring anyone."]
        );
        assert_eq!(hub.ignores.count(alice.id).await, 0);
    }

    #[tokio::test]
    async fn usage_and_help() {
        let hub = test_hub("").await;
        let (tx, _rx) = mpsc::channel(8);
        let alice = hub.connect("alice", tx).await.unwrap();

        let lines = run(&hub, &alice, "/ignore").await.unwrap();
        assert_eq!(lines[0], "Usage:");
        assert_eq!(lines.len(), 5);

        let lines = run(&hub, &alice, "/ignore HELP").await.unwrap();
        assert_eq!(lines[0], "=== Ignore ===");
        assert!(lines.iter().any(|line| line.contains("/ignore clear")));
    }

    #[tokio::test]
    async fn completion_offers_subcommands_and_other_users() {
        let hub = test_hub("").await;
        let (tx, _rx) = mpsc::channel(8);
        let alice = hub.connect("alice", tx.clone()).await.unwrap();
        let _carol = hub.connect("Carol", tx.clone()).await.unwrap();
        let _hank = hub.connect("hank", tx).await.unwrap();

        assert_eq!(
            IgnoreCommand::complete(&hub, alice.id, "c"),
            vec!["clear", "Carol"]
        );
        assert_eq!(
            IgnoreCommand::complete(&hub, alice.id, "A"),
            Vec::<String>::new()
        );
        assert_eq!(
            IgnoreCommand::complete(&hub, alice.id, ""),
            vec!["list", "clear", "help", "Carol", "hank"]
        );

        let lines = run(&hub, &alice, "/ignore h\t").await.unwrap();
        assert_eq!(lines, vec!["COMPLETIONS help hank"]);
        let lines = run(&hub, &alice, "/ignore list x\t").await.unwrap();
        assert_eq!(lines, vec!["COMPLETIONS"]);
    }
}
