//! In-memory ignore cache for fast per-message checks.
//!
//! Holds the complete ignore set of every active actor so the chat filter
//! never touches the database for them.
//!
//! # Architecture
//!
//! - Never authoritative: every entry is a copy of what the database holds
//! - Filled on connect or on a positive lazy lookup, evicted on disconnect
//! - `None` from [`IgnoreCache::get`] means "not loaded", which is different
//!   from a loaded empty set
//!
//! Entries are sharded by DashMap; each mutation of one actor's set runs
//! under that shard's write lock, so concurrent updates are never lost.

use dashmap::DashMap;
use std::collections::HashSet;
use uuid::Uuid;

/// Actor id -> set of ignored target ids.
#[derive(Debug, Default)]
pub struct IgnoreCache {
    entries: DashMap<Uuid, HashSet<Uuid>>,
}

impl IgnoreCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Copy of the actor's ignore set, or `None` when not loaded.
    pub fn get(&self, actor: &Uuid) -> Option<HashSet<Uuid>> {
        self.entries.get(actor).map(|set| set.clone())
    }

    /// Hot-path probe: `Some(answer)` when the actor is loaded.
    #[inline]
    pub fn contains(&self, actor: &Uuid, target: &Uuid) -> Option<bool> {
        self.entries.get(actor).map(|set| set.contains(target))
    }

    /// Size of the actor's ignore set, or `None` when not loaded.
    pub fn count(&self, actor: &Uuid) -> Option<usize> {
        self.entries.get(actor).map(|set| set.len())
    }

    /// Replace the actor's entry with a full set.
    pub fn put(&self, actor: Uuid, targets: HashSet<Uuid>) {
        self.entries.insert(actor, targets);
    }

    /// Add one target, creating the entry if needed.
    pub fn add_to(&self, actor: Uuid, target: Uuid) {
        self.entries.entry(actor).or_default().insert(target);
    }

    /// Remove one target. An entry left empty is dropped.
    pub fn remove_from(&self, actor: &Uuid, target: &Uuid) {
        if let Some(mut set) = self.entries.get_mut(actor) {
            set.remove(target);
        }
        self.entries.remove_if(actor, |_, set| set.is_empty());
    }

    /// Drop the actor's entry.
    pub fn evict(&self, actor: &Uuid) {
        self.entries.remove(actor);
    }

    /// Number of loaded actors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no actor is loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
