//! Database module for persistent storage.
//!
//! Provides async SQLite database access using SQLx for:
//! - Ignore relations (actor -> target pairs)
//! - Known users, so offline targets can still be shown by name

mod ignores;
mod users;

pub use ignores::IgnoreRepository;
pub use users::UserRepository;

use sqlx::SqlitePool;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
    #[error("migration error: {0}")]
    Migration(sqlx::migrate::MigrateError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
    const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

    /// Open (or create) the database at `path` and bring its schema up to
    /// date. `":memory:"` gives a private in-memory database.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let (options, max_connections) = Self::connect_options(path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .idle_timeout(Some(Self::IDLE_TIMEOUT))
            .test_before_acquire(true)
            .connect_with(
                options
                    .busy_timeout(Self::BUSY_TIMEOUT)
                    // Readers keep going while a command writes.
                    .journal_mode(SqliteJournalMode::Wal)
                    // An acknowledged ignore must survive a crash.
                    .synchronous(SqliteSynchronous::Full)
                    .create_if_missing(true),
            )
            .await?;
        info!(path, max_connections, "Database connected");

        Self::run_migrations(&pool).await?;
        Self::verify_integrity(&pool).await?;

        Ok(Self { pool })
    }

    /// Connection options and pool size for `path`.
    fn connect_options(path: &str) -> (SqliteConnectOptions, u32) {
        if path == ":memory:" {
            // Named per call: a bare shared-cache memory database would be
            // shared by every test in the process.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let uri = format!(
                "file:ignored-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );
            return (SqliteConnectOptions::new().filename(uri).shared_cache(true), 1);
        }

        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), error = %e, "Failed to create database directory");
        }
        (SqliteConnectOptions::new().filename(path), 5)
    }

    async fn verify_integrity(pool: &SqlitePool) -> Result<(), DbError> {
        let verdict: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(pool)
            .await?;

        if verdict != "ok" {
            error!(integrity_check = %verdict, "Database integrity check failed");
            return Err(DbError::Internal(format!("integrity check failed: {}", verdict)));
        }
        debug!("Database integrity check passed");
        Ok(())
    }

    /// Run embedded migrations.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(DbError::Migration)?;

        debug!("Database migrations applied");
        Ok(())
    }

    /// Get ignore relation repository.
    pub fn ignores(&self) -> IgnoreRepository<'_> {
        IgnoreRepository::new(&self.pool)
    }

    /// Get known-user repository.
    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }

    /// Close the pool, waiting for in-flight statements.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database closed");
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Sqlx(err)
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_databases_are_isolated() {
        let a = Database::new(":memory:").await.unwrap();
        let b = Database::new(":memory:").await.unwrap();

        let actor = uuid::Uuid::new_v4();
        let target = uuid::Uuid::new_v4();
        a.ignores().add(actor, target).await.unwrap();

        assert!(a.ignores().exists(actor, target).await.unwrap());
        assert!(!b.ignores().exists(actor, target).await.unwrap());
    }

    #[tokio::test]
    async fn file_connections_use_wal_and_full_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ignored.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(mode, "wal");

        // 2 = FULL
        let sync: i64 = sqlx::query_scalar("PRAGMA synchronous")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(sync, 2);
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ignored.db");
        let path = path.to_str().unwrap().to_string();

        let actor = uuid::Uuid::new_v4();
        let target = uuid::Uuid::new_v4();

        {
            let db = Database::new(&path).await.unwrap();
            db.ignores().add(actor, target).await.unwrap();
            db.close().await;
        }

        let db = Database::new(&path).await.unwrap();
        assert!(db.ignores().exists(actor, target).await.unwrap());
        assert_eq!(db.ignores().count(actor).await.unwrap(), 1);
    }
}
