//! Known-user repository.
//!
//! Remembers the last display name seen for each user id so ignore lists can
//! name targets that are offline.

use super::DbError;
use sqlx::SqlitePool;
use uuid::Uuid;

/// A user this server has seen at least once.
#[derive(Debug, Clone)]
pub struct KnownUser {
    pub id: Uuid,
    pub name: String,
    pub last_seen_at: i64,
}

/// Repository for known users.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a user's name and last-seen time.
    pub async fn touch(&self, id: Uuid, name: &str) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, last_seen_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, last_seen_at = excluded.last_seen_at
            "#,
        )
        .bind(id.to_string())
        .bind(name)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Find a user by id.
    pub async fn find(&self, id: Uuid) -> Result<Option<KnownUser>, DbError> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT name, last_seen_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(name, last_seen_at)| KnownUser {
            id,
            name,
            last_seen_at,
        }))
    }
}
