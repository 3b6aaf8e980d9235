//! Shared server state and the connect/disconnect lifecycle.
//!
//! One `Hub` lives for the whole process behind an `Arc` and is handed to
//! every connection task.

use crate::config::Config;
use crate::db::Database;
use crate::error::ConnectError;
use crate::state::roster::Roster;
use crate::state::service::IgnoreService;
use crate::state::uid::{is_valid_name, user_id};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Shared server state.
pub struct Hub {
    pub config: Config,
    pub db: Database,
    pub roster: Roster,
    pub ignores: Arc<IgnoreService>,
}

/// A logged-in connection, returned by [`Hub::connect`] and consumed by
/// [`Hub::disconnect`].
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub name: String,
    prefetch: JoinHandle<()>,
}

impl Hub {
    pub fn new(config: Config, db: Database, ignores: Arc<IgnoreService>) -> Self {
        let roster = Roster::new(db.clone());
        Self {
            config,
            db,
            roster,
            ignores,
        }
    }

    /// Log a user in.
    ///
    /// Registers the name in the roster, remembers it for offline lookups and
    /// warms the user's ignore list in the background. Does not wait for
    /// the warm-up.
    pub async fn connect(
        &self,
        name: &str,
        sender: mpsc::Sender<String>,
    ) -> Result<Session, ConnectError> {
        if !is_valid_name(name) {
            return Err(ConnectError::InvalidName);
        }

        let id = user_id(name);
        if !self.roster.insert(id, name, sender) {
            return Err(ConnectError::NameInUse);
        }

        if let Err(e) = self.db.users().touch(id, name).await {
            warn!(%id, name, error = %e, "Failed to record user name");
        }

        let ignores = Arc::clone(&self.ignores);
        let prefetch = tokio::spawn(async move { ignores.load_on_connect(id).await });

        info!(%id, name, online = self.roster.online_count(), "User connected");
        Ok(Session {
            id,
            name: name.to_string(),
            prefetch,
        })
    }

    /// Log a user out and drop their cached ignore list.
    pub async fn disconnect(&self, session: Session) {
        // A prefetch still in flight must not repopulate the cache after eviction.
        session.prefetch.abort();
        self.roster.remove(&session.id);
        self.ignores.evict_on_disconnect(session.id).await;

        info!(id = %session.id, name = %session.name, online = self.roster.online_count(), "User disconnected");
    }
}

#[cfg(test)]
pub(crate) async fn test_hub(ignore_section: &str) -> Hub {
    use crate::state::cache::IgnoreCache;

    let config: Config = toml::from_str(&format!(
        "[server]\nname = \"chat.test\"\n\n[listen]\naddress = \"127.0.0.1:0\"\n\n{}",
        ignore_section
    ))
    .unwrap();
    let db = Database::new(":memory:").await.unwrap();
    let ignores = Arc::new(IgnoreService::new(db.clone(), Arc::new(IgnoreCache::new())));
    Hub::new(config, db, ignores)
}
