//! # Database Migrations
//!
//! The SQL files under `migrations/sqlite/` are embedded into the binary
//! at compile time and applied on startup. sqlx tracks what has run in its
//! `_sqlx_migrations` table, so re-running is a no-op.
//!
//! Rules for new migrations:
//! - next sequence number, `NNN_description.sql`
//! - idempotent SQL (`IF NOT EXISTS` where possible)
//! - applied files are immutable; fixes go in a new file

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applied/total migration counts, for diagnostics endpoints.
#[derive(Debug, Clone, Copy)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
}

/// Applies pending migrations in filename order, each in its own
/// transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(total = MIGRATOR.migrations.len(), "Migrations up to date");
    Ok(())
}

/// Reports how many of the embedded migrations have been applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok(MigrationStatus {
        total: MIGRATOR.migrations.len(),
        applied: applied as usize,
    })
}
