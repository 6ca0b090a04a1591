//! # Database Pool Management
//!
//! Connection pool creation and SQLite tuning.
//!
//! Two pragmas matter for this workload:
//!
//! - **WAL journal**: dashboards read summaries while movements commit;
//!   WAL lets those reads proceed without blocking the writer.
//! - **busy_timeout**: SQLite admits one writer at a time. Movement
//!   transactions queue on that writer lock instead of failing fast, which
//!   is exactly the serialization the check-then-act on available stock
//!   relies on - the queued transaction re-reads state the first one
//!   committed.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::audit::AuditRepository;
use crate::repository::item::ItemRepository;
use crate::repository::location::LocationRepository;
use crate::repository::menu::MenuRepository;
use crate::repository::movement::MovementRepository;
use crate::repository::stock::StockRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Connection pool settings.
///
/// The defaults suit a single-venue service: a handful of pooled
/// connections, migrations applied on startup.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite database file; created on first connect.
    pub database_path: PathBuf,

    /// Pool size bounds.
    pub max_connections: u32,
    pub min_connections: u32,

    /// How long to wait for a free connection before giving up.
    pub connect_timeout: Duration,

    /// How long an idle connection may linger before the pool closes it.
    pub idle_timeout: Duration,

    /// Apply pending migrations during `Database::new`.
    pub run_migrations: bool,
}

impl DbConfig {
    /// Configuration for a file-backed database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Overrides the maximum pool size.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Overrides the minimum pool size.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Overrides the acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Disables (or re-enables) startup migrations.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// An isolated in-memory database, one connection, for tests.
    ///
    /// A second connection to `:memory:` would open a *different* database,
    /// so the pool is pinned to a single connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            // NORMAL keeps the file corruption-safe; at worst the last
            // transaction is lost on power failure.
            .synchronous(SqliteSynchronous::Normal)
            // SQLite leaves foreign keys off unless asked.
            .foreign_keys(true)
            // Queue on the single writer lock instead of erroring.
            .busy_timeout(Duration::from_secs(5))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Cloneable handle over the pool; hands out repositories.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database, tunes SQLite, builds the
    /// pool and applies migrations per `config`.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening database"
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// The raw pool, for starting transactions.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inventory item repository.
    pub fn items(&self) -> ItemRepository {
        ItemRepository::new(self.pool.clone())
    }

    /// Storage location repository.
    pub fn locations(&self) -> LocationRepository {
        LocationRepository::new(self.pool.clone())
    }

    /// Per-(item, location) ledger repository.
    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.pool.clone())
    }

    /// Movement log repository.
    pub fn movements(&self) -> MovementRepository {
        MovementRepository::new(self.pool.clone())
    }

    /// Audit trail repository.
    pub fn audit(&self) -> AuditRepository {
        AuditRepository::new(self.pool.clone())
    }

    /// Menu repository.
    pub fn menus(&self) -> MenuRepository {
        MenuRepository::new(self.pool.clone())
    }

    /// Closes the pool; repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    /// True when the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_migrates_and_responds() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let status = migrations::migration_status(db.pool()).await.unwrap();
        assert!(status.total > 0);
        assert_eq!(status.total, status.applied);
    }

    #[tokio::test]
    async fn test_builder_overrides() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
    }
}
