//! Error types for the PostgreSQL storage backend.

use cafe_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for unique constraint violations (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL error code for foreign key violations (23503).
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL error code for values too long for their column (22001).
pub const PG_STRING_DATA_RIGHT_TRUNCATION: &str = "22001";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Checks if a sqlx error is a unique violation (23505).
pub fn is_unique_violation(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNIQUE_VIOLATION)
}

/// Maps a sqlx error from a read or an unconstrained write.
pub(crate) fn db_error(err: SqlxError) -> StorageError {
    match err {
        SqlxError::Io(_) | SqlxError::PoolTimedOut | SqlxError::PoolClosed => {
            StorageError::connection_error(err.to_string())
        }
        other => StorageError::internal(other.to_string()),
    }
}

/// Maps a sqlx error from an insert or update on `entity` identified by `key`.
pub(crate) fn write_error(err: SqlxError, entity: &'static str, key: &str) -> StorageError {
    if is_unique_violation(&err) {
        StorageError::already_exists(entity, key)
    } else if has_pg_error_code(&err, PG_FOREIGN_KEY_VIOLATION)
        || has_pg_error_code(&err, PG_STRING_DATA_RIGHT_TRUNCATION)
    {
        StorageError::invalid_data(err.to_string())
    } else {
        db_error(err)
    }
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));

        let err = PostgresError::Migration("checksum mismatch".into());
        assert!(err.to_string().contains("Migration error"));
    }

    #[test]
    fn test_conversion_to_storage_error() {
        let pg_err = PostgresError::config("test error");
        let storage_err: StorageError = pg_err.into();
        assert!(matches!(storage_err, StorageError::Internal { .. }));
    }

    #[test]
    fn test_non_database_errors_have_no_code() {
        assert!(!is_unique_violation(&SqlxError::RowNotFound));
        assert!(matches!(
            db_error(SqlxError::PoolTimedOut),
            StorageError::ConnectionError { .. }
        ));
        assert!(matches!(
            write_error(SqlxError::RowNotFound, "Cafe", "x"),
            StorageError::Internal { .. }
        ));
    }
}
