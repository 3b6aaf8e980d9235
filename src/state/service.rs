//! Ignore service: the write-through façade over the database and cache.
//!
//! Every caller (chat filter, whisper filter, `/ignore` command, connect
//! hooks) goes through [`IgnoreService`]. Reads are cache-first; writes hit
//! the database first and only then the cache, so the cache can always be
//! thrown away and rebuilt.
//!
//! Mutations and loads of one actor are serialized by a per-actor async
//! mutex. That keeps a connect-time load from overwriting a concurrent
//! `/ignore` with a stale set, and makes toggle atomic. Cache hits take no
//! lock.

use crate::db::Database;
use crate::error::{IgnoreError, RemoveOutcome};
use crate::state::cache::IgnoreCache;
use crate::state::roster::Directory;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Ignore relation service.
pub struct IgnoreService {
    db: Database,
    cache: Arc<IgnoreCache>,
    /// Per-actor mutation locks, dropped on disconnect.
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl IgnoreService {
    /// Create a service over `db`, fronted by `cache`.
    pub fn new(db: Database, cache: Arc<IgnoreCache>) -> Self {
        Self {
            db,
            cache,
            locks: DashMap::new(),
        }
    }

    fn actor_lock(&self, actor: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(&self.locks.entry(actor).or_default())
    }

    /// Whether `actor` ignores `target`.
    ///
    /// Hot path for message and whisper filtering. A storage failure is
    /// logged and answered with `false`, so chat keeps flowing.
    pub async fn is_ignoring(&self, actor: Uuid, target: Uuid) -> bool {
        match self.check(actor, target).await {
            Ok(ignoring) => ignoring,
            Err(e) => {
                warn!(%actor, %target, error = %e, code = e.error_code(), "Ignore lookup failed, delivering");
                false
            }
        }
    }

    /// Strict form of [`is_ignoring`](Self::is_ignoring): a storage failure is
    /// returned instead of being read as "not ignoring".
    ///
    /// On a cache miss the database is probed. A positive answer loads the
    /// actor's full set so the next call is a hit; a negative answer leaves
    /// the cache untouched.
    pub async fn check(&self, actor: Uuid, target: Uuid) -> Result<bool, IgnoreError> {
        if let Some(hit) = self.cache.contains(&actor, &target) {
            return Ok(hit);
        }

        let exists = self.db.ignores().exists(actor, target).await?;
        if exists {
            let lock = self.actor_lock(actor);
            let _guard = lock.lock().await;
            if self.cache.count(&actor).is_none()
                && let Err(e) = self.load_locked(actor).await
            {
                warn!(%actor, error = %e, "Lazy ignore load failed");
            }
        }

        Ok(exists)
    }

    /// Record that `actor` ignores `target`.
    #[allow(dead_code)]
    pub async fn add(&self, actor: Uuid, target: Uuid) -> Result<(), IgnoreError> {
        let lock = self.actor_lock(actor);
        let _guard = lock.lock().await;
        self.add_locked(actor, target).await
    }

    /// Forget that `actor` ignores `target`.
    ///
    /// `Ok(NotIgnored)` means there was nothing to remove; an `Err` leaves
    /// the previous state in place.
    #[allow(dead_code)]
    pub async fn remove(&self, actor: Uuid, target: Uuid) -> Result<RemoveOutcome, IgnoreError> {
        let lock = self.actor_lock(actor);
        let _guard = lock.lock().await;
        self.remove_locked(actor, target).await
    }

    /// Flip the relation and return the new state (`true` = now ignoring).
    pub async fn toggle(&self, actor: Uuid, target: Uuid) -> Result<bool, IgnoreError> {
        let lock = self.actor_lock(actor);
        let _guard = lock.lock().await;

        let ignoring = match self.cache.contains(&actor, &target) {
            Some(hit) => hit,
            None => self.db.ignores().exists(actor, target).await?,
        };

        if ignoring {
            self.remove_locked(actor, target).await?;
            Ok(false)
        } else {
            self.add_locked(actor, target).await?;
            Ok(true)
        }
    }

    /// Remove every relation of `actor`. Returns how many were removed.
    pub async fn clear(&self, actor: Uuid) -> Result<usize, IgnoreError> {
        let lock = self.actor_lock(actor);
        let _guard = lock.lock().await;

        let removed = self.db.ignores().clear(actor).await.inspect_err(|e| {
            warn!(%actor, error = %e, "Failed to clear ignore list");
        })?;
        self.cache.evict(&actor);

        debug!(%actor, removed, "Ignore list cleared");
        Ok(removed as usize)
    }

    /// Every target `actor` ignores. Cache-first; a non-empty set read from
    /// the database is cached. Failures read as an empty set.
    pub async fn targets(&self, actor: Uuid) -> HashSet<Uuid> {
        if let Some(targets) = self.cache.get(&actor) {
            return targets;
        }

        let lock = self.actor_lock(actor);
        let _guard = lock.lock().await;
        if let Some(targets) = self.cache.get(&actor) {
            return targets;
        }

        match self.db.ignores().list_targets(actor).await {
            Ok(targets) => {
                if !targets.is_empty() {
                    self.cache.put(actor, targets.clone());
                }
                targets
            }
            Err(e) => {
                warn!(%actor, error = %e, "Failed to list ignores");
                HashSet::new()
            }
        }
    }

    /// Display lines for `actor`'s ignore list: `"<name> [Online]"` or
    /// `"<name> [Offline]"`, sorted case-insensitively. Targets without a
    /// known name are left out.
    pub async fn list_formatted(&self, actor: Uuid, directory: &dyn Directory) -> Vec<String> {
        let mut lines = Vec::new();

        for target in self.targets(actor).await {
            let Some(name) = directory.display_name(target).await else {
                debug!(%actor, %target, "Ignored user has no known name, skipping");
                continue;
            };
            let status = if directory.is_online(&target) {
                "[Online]"
            } else {
                "[Offline]"
            };
            lines.push(format!("{} {}", name, status));
        }

        lines.sort_by_cached_key(|line| line.to_lowercase());
        lines
    }

    /// How many users `actor` ignores. Does not load the cache on a miss.
    pub async fn count(&self, actor: Uuid) -> usize {
        if let Some(count) = self.cache.count(&actor) {
            return count;
        }

        self.db.ignores().count(actor).await.unwrap_or_else(|e| {
            warn!(%actor, error = %e, "Failed to count ignores");
            0
        })
    }

    /// Warm the cache for a user who just connected. Meant to run in a
    /// background task. An empty set is cached too, so a connected user with
    /// no ignores never costs a database probe.
    pub async fn load_on_connect(&self, actor: Uuid) {
        let lock = self.actor_lock(actor);
        let _guard = lock.lock().await;

        match self.load_locked(actor).await {
            Ok(loaded) => debug!(%actor, loaded, "Ignore list prefetched"),
            Err(e) => warn!(%actor, error = %e, "Ignore prefetch failed"),
        }
    }

    /// Drop a disconnected user's cache entry. Their relations stay in the
    /// database and are reloaded on the next connect.
    pub async fn evict_on_disconnect(&self, actor: Uuid) {
        let lock = self.actor_lock(actor);
        let _guard = lock.lock().await;

        self.cache.evict(&actor);
        // Our clone plus the map's: nobody else is waiting on it.
        self.locks
            .remove_if(&actor, |_, held| Arc::strong_count(held) == 2);
    }

    /// Number of actors with a cached ignore set.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached set. Lookups fall back to the database until
    /// users reconnect or hit a positive lazy load.
    pub fn reset_cache(&self) {
        if self.cache.is_empty() {
            return;
        }
        let dropped = self.cache.len();
        self.cache.clear();
        debug!(dropped, "Ignore cache reset");
    }

    async fn load_locked(&self, actor: Uuid) -> Result<usize, IgnoreError> {
        let targets = self.db.ignores().list_targets(actor).await?;
        let loaded = targets.len();
        self.cache.put(actor, targets);
        Ok(loaded)
    }

    async fn add_locked(&self, actor: Uuid, target: Uuid) -> Result<(), IgnoreError> {
        self.db.ignores().add(actor, target).await.inspect_err(|e| {
            warn!(%actor, %target, error = %e, "Failed to store ignore");
        })?;

        if self.cache.count(&actor).is_some() {
            self.cache.add_to(actor, target);
        } else if let Err(e) = self.load_locked(actor).await {
            // Stored but not cached; the next lookup reloads from the database.
            warn!(%actor, error = %e, "Failed to load ignore list after add");
        }

        Ok(())
    }

    async fn remove_locked(&self, actor: Uuid, target: Uuid) -> Result<RemoveOutcome, IgnoreError> {
        let removed = self.db.ignores().remove(actor, target).await.inspect_err(|e| {
            warn!(%actor, %target, error = %e, "Failed to delete ignore");
        })?;
        self.cache.remove_from(&actor, &target);

        Ok(if removed {
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::NotIgnored
        })
    }
}
