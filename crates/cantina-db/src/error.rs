//! # Database Error Types
//!
//! `DbError` wraps sqlx failures with enough context to tell "you asked
//! for something that isn't there" apart from "storage broke". SQLite
//! reports constraint violations only through its error message text, so
//! the conversion below sniffs the message to recover the constraint kind.

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row for the given entity/id (or it was soft-deactivated).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write - duplicate SKU, duplicate
    /// location name, or a replayed idempotency key racing its original.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A referenced row does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The entity is still referenced and may not be removed - e.g. a
    /// storage location that holds stock or appears in movement history.
    #[error("{entity} {id} is referenced and cannot be deleted")]
    InUse { entity: String, id: String },

    /// An embedded JSON column (ledger `open_packages`, menu
    /// `rule_config`) failed to round-trip.
    #[error("Serialization failed for {context}: {message}")]
    Serialization { context: String, message: String },

    /// Could not open or reach the database file.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A migration file failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// The statement itself failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Every pooled connection was busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Anything sqlx reports that fits none of the above.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn in_use(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::InUse {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn serialization(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        DbError::Serialization {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

/// Recovers the constraint kind from SQLite's message text.
///
/// SQLite phrases these as `UNIQUE constraint failed: <table>.<column>` and
/// `FOREIGN KEY constraint failed`.
fn classify_database_error(message: &str) -> DbError {
    if let Some(field) = message.strip_prefix("UNIQUE constraint failed: ") {
        return DbError::UniqueViolation {
            field: field.to_string(),
            value: "unknown".to_string(),
        };
    }
    if message.contains("UNIQUE constraint failed") {
        return DbError::UniqueViolation {
            field: "unknown".to_string(),
            value: "unknown".to_string(),
        };
    }
    if message.contains("FOREIGN KEY constraint failed") {
        return DbError::ForeignKeyViolation {
            message: message.to_string(),
        };
    }
    DbError::QueryFailed(message.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => classify_database_error(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
