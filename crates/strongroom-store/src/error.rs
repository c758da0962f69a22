use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// A uniqueness or reference constraint would be broken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The group is still assigned to at least one user.
    #[error("Group '{name}' still has {users} user(s)")]
    GroupInUse { name: String, users: i64 },

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// `QueryReturnedNoRows` becomes [`StoreError::NotFound`]; everything else
/// stays a SQLite error.
pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

/// Map constraint violations to [`StoreError::Conflict`] with the given
/// message.
pub(crate) fn conflict(e: rusqlite::Error, message: &str) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(message.to_string())
        }
        other => StoreError::Sqlite(other),
    }
}
