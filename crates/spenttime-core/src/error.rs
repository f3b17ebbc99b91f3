//! Error types for the spent-time core.

use thiserror::Error;

/// Errors raised while building or mutating a [`crate::Record`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Display name was empty or whitespace.
    #[error("display name cannot be blank")]
    BlankName,

    /// Time arithmetic would overflow or go negative.
    #[error("spent time arithmetic out of range")]
    TimeOverflow,
}

/// Errors surfaced by a [`crate::RecordRepository`].
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// Underlying storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored row could not be mapped back to a record.
    #[error("corrupt row for {identity}: {reason}")]
    CorruptRow { identity: String, reason: String },
}

/// Errors returned by the record service and leaderboard.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Record is neither cached nor stored.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Operation exceeded its time bound.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    /// Repository call failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Component used before startup completed.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Rejected argument, checked before any work begins.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] RecordError),
}

impl ServiceError {
    pub(crate) fn timeout(operation: &'static str, after: std::time::Duration) -> Self {
        ServiceError::Timeout {
            operation,
            after_ms: after.as_millis() as u64,
        }
    }

    /// Whether this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceError::Timeout { .. })
    }
}

/// Errors loading or saving the JSON config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors produced by the migration runner and migrators.
#[derive(Debug, Clone, Error)]
pub enum MigrationError {
    /// A single candidate exceeded the per-item timeout.
    #[error("migration item timed out after {0}ms")]
    ItemTimeout(u64),

    /// Migrator reported a failure for a candidate.
    #[error("migrator failed: {0}")]
    Migrator(String),

    /// Repository failure while migrating a candidate.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The whole run exceeded the global timeout.
    #[error("migration timed out after {after_ms}ms ({completed}/{total} items finished)")]
    GlobalTimeout {
        after_ms: u64,
        completed: usize,
        total: usize,
    },

    /// Migrator task panicked or was cancelled.
    #[error("migration task aborted: {0}")]
    TaskAborted(String),
}

impl From<RecordError> for MigrationError {
    fn from(e: RecordError) -> Self {
        MigrationError::Migrator(e.to_string())
    }
}
