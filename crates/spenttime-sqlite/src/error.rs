use thiserror::Error;

use spenttime_core::RepositoryError;

/// Errors raised by the SQLite store.
#[derive(Debug, Error)]
pub enum SqliteRepositoryError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A thread panicked while holding the connection.
    #[error("connection mutex poisoned")]
    Poisoned,

    /// Blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Join(String),

    /// Stored row does not map back to a record.
    #[error("corrupt row for {identity}: {reason}")]
    CorruptRow { identity: String, reason: String },

    /// Spent time too large for an INTEGER column.
    #[error("spent time {0}ms exceeds storage range")]
    OutOfRange(u64),
}

impl From<SqliteRepositoryError> for RepositoryError {
    fn from(e: SqliteRepositoryError) -> Self {
        match e {
            SqliteRepositoryError::CorruptRow { identity, reason } => {
                RepositoryError::CorruptRow { identity, reason }
            }
            other => RepositoryError::Storage(other.to_string()),
        }
    }
}
