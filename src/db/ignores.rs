//! Ignore relation repository.
//!
//! Durable storage for (actor, target) pairs. This layer holds no cache and
//! enforces no policy: self-ignore is storable, and callers decide how to
//! degrade on failure.

use super::DbError;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

/// Rows `list_targets` and `count` agree on: a hyphenated hex UUID.
const VALID_TARGET: &str =
    "target GLOB '????????-????-????-????-????????????' AND target NOT GLOB '*[^0-9a-fA-F-]*'";

/// Repository for ignore relations.
pub struct IgnoreRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> IgnoreRepository<'a> {
    /// Create a new ignore repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record that `actor` ignores `target`.
    ///
    /// Idempotent: an existing pair only has its timestamp refreshed.
    pub async fn add(&self, actor: Uuid, target: Uuid) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO ignores (actor, target, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(actor, target) DO UPDATE SET created_at = excluded.created_at
            "#,
        )
        .bind(actor.to_string())
        .bind(target.to_string())
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete the pair. Returns `true` if a row was deleted, `false` if there
    /// was nothing to delete.
    pub async fn remove(&self, actor: Uuid, target: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM ignores WHERE actor = ? AND target = ?")
            .bind(actor.to_string())
            .bind(target.to_string())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Point lookup.
    pub async fn exists(&self, actor: Uuid, target: Uuid) -> Result<bool, DbError> {
        let row = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM ignores WHERE actor = ? AND target = ? LIMIT 1",
        )
        .bind(actor.to_string())
        .bind(target.to_string())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Every target `actor` ignores.
    ///
    /// Rows whose target is not a UUID are left out here and in
    /// [`count`](Self::count) alike.
    pub async fn list_targets(&self, actor: Uuid) -> Result<HashSet<Uuid>, DbError> {
        let sql = format!("SELECT target FROM ignores WHERE actor = ? AND {VALID_TARGET}");
        let rows = sqlx::query_scalar::<_, String>(&sql)
            .bind(actor.to_string())
            .fetch_all(self.pool)
            .await?;

        let mut targets = HashSet::with_capacity(rows.len());
        for raw in rows {
            match Uuid::parse_str(&raw) {
                Ok(target) => {
                    targets.insert(target);
                }
                Err(e) => {
                    warn!(%actor, target = %raw, error = %e, "Invalid target id in ignore table");
                }
            }
        }

        Ok(targets)
    }

    /// Number of targets `actor` ignores, counted by SQLite.
    pub async fn count(&self, actor: Uuid) -> Result<usize, DbError> {
        let sql = format!("SELECT COUNT(*) FROM ignores WHERE actor = ? AND {VALID_TARGET}");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(actor.to_string())
            .fetch_one(self.pool)
            .await?;

        usize::try_from(count).map_err(|_| DbError::Internal(format!("negative count {count}")))
    }

    /// Delete every relation of `actor`. Returns the number of rows deleted.
    pub async fn clear(&self, actor: Uuid) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM ignores WHERE actor = ?")
            .bind(actor.to_string())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
