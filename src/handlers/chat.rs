//! Public chat and the recipient filter.

use crate::state::{Hub, IgnoreService, Session};
use uuid::Uuid;

/// Keep only the recipients who are not ignoring `sender`.
pub async fn filter_recipients(
    service: &IgnoreService,
    sender: Uuid,
    recipients: Vec<Uuid>,
) -> Vec<Uuid> {
    let mut kept = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        if !service.is_ignoring(recipient, sender).await {
            kept.push(recipient);
        }
    }
    kept
}

/// Send a chat line to every other online user who is not ignoring the
/// sender. Returns how many users it was queued for.
pub async fn broadcast(hub: &Hub, session: &Session, text: &str) -> usize {
    let others: Vec<Uuid> = hub
        .roster
        .online_ids()
        .into_iter()
        .filter(|id| *id != session.id)
        .collect();

    let line = format!("{}: {}", session.name, text);
    filter_recipients(&hub.ignores, session.id, others)
        .await
        .iter()
        .filter(|id| hub.roster.send(id, line.as_str()))
        .count()
}
