use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The targeted row does not exist under the query's visibility rules.
    #[error("Record not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("{field} is already registered")]
    Conflict { field: &'static str },

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Translate a SQLite unique-constraint failure on the users table into a
/// [`StoreError::Conflict`] naming the offending field. Uniqueness is
/// enforced globally, including soft-deleted rows.
pub(crate) fn map_unique_violation(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(err, Some(msg)) = &e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation {
            if msg.contains("users.email") {
                return StoreError::Conflict { field: "email" };
            }
            if msg.contains("users.username") {
                return StoreError::Conflict { field: "username" };
            }
        }
    }
    StoreError::Sqlite(e)
}
