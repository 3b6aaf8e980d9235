//! Online users and display name resolution.
//!
//! The `Roster` tracks who is connected, their outgoing line channel and the
//! name they logged in with. Names of users who are offline come from the
//! `users` table.

use crate::db::Database;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Name and presence lookups used to render ignore lists.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Display name for `id`, or `None` if this server never saw that user.
    async fn display_name(&self, id: Uuid) -> Option<String>;

    /// Whether `id` is connected right now.
    fn is_online(&self, id: &Uuid) -> bool;
}

/// A connected user.
#[derive(Debug, Clone)]
pub struct OnlineUser {
    pub name: String,
    pub sender: mpsc::Sender<String>,
}

/// Connected users, keyed by id and by case-folded name.
pub struct Roster {
    users: DashMap<Uuid, OnlineUser>,
    names: DashMap<String, Uuid>,
    db: Database,
}

impl Roster {
    pub fn new(db: Database) -> Self {
        Self {
            users: DashMap::new(),
            names: DashMap::new(),
            db,
        }
    }

    /// Register a connection. Returns `false` if the name is already online.
    pub fn insert(&self, id: Uuid, name: &str, sender: mpsc::Sender<String>) -> bool {
        match self.names.entry(name.to_lowercase()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(id);
                self.users.insert(
                    id,
                    OnlineUser {
                        name: name.to_string(),
                        sender,
                    },
                );
                true
            }
        }
    }

    /// Remove a connection.
    pub fn remove(&self, id: &Uuid) {
        if let Some((_, user)) = self.users.remove(id) {
            self.names
                .remove_if(&user.name.to_lowercase(), |_, owner| owner == id);
        }
    }

    /// Id of the online user called `name` (case-insensitive).
    pub fn find(&self, name: &str) -> Option<Uuid> {
        self.names.get(&name.to_lowercase()).map(|id| *id)
    }

    /// Name of an online user.
    pub fn name(&self, id: &Uuid) -> Option<String> {
        self.users.get(id).map(|user| user.name.clone())
    }

    /// Ids of everyone online.
    pub fn online_ids(&self) -> Vec<Uuid> {
        self.users.iter().map(|entry| *entry.key()).collect()
    }

    /// Names of online users starting with `prefix` (case-insensitive), sorted.
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        let mut names: Vec<String> = self
            .users
            .iter()
            .filter(|entry| entry.name.to_lowercase().starts_with(&prefix))
            .map(|entry| entry.name.clone())
            .collect();
        names.sort_by_cached_key(|name| name.to_lowercase());
        names
    }

    /// Number of online users.
    pub fn online_count(&self) -> usize {
        self.users.len()
    }

    /// Queue a line for `id`. Dropped if the user is gone or their queue is full.
    pub fn send(&self, id: &Uuid, line: impl Into<String>) -> bool {
        let Some(sender) = self.users.get(id).map(|user| user.sender.clone()) else {
            return false;
        };
        match sender.try_send(line.into()) {
            Ok(()) => true,
            Err(e) => {
                debug!(%id, error = %e, "Dropping line for slow or closed client");
                false
            }
        }
    }
}

#[async_trait]
impl Directory for Roster {
    async fn display_name(&self, id: Uuid) -> Option<String> {
        if let Some(name) = self.name(&id) {
            return Some(name);
        }

        match self.db.users().find(id).await {
            Ok(Some(user)) => {
                debug!(id = %user.id, last_seen_at = user.last_seen_at, "Resolved offline user");
                Some(user.name)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(%id, error = %e, "Failed to resolve user name");
                None
            }
        }
    }

    fn is_online(&self, id: &Uuid) -> bool {
        self.users.contains_key(id)
    }
}
