//! Error types for the entry store.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the entry store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Entry rejected before any embedding or store call.
    #[error("invalid entry: {0}")]
    Validation(String),

    /// The backend reported a lock/busy condition. Retried internally.
    #[error("store locked: {0}")]
    Locked(String),

    /// Lock/busy persisted through every retry.
    #[error("store busy after {attempts} attempts, retry later")]
    Busy { attempts: u32 },

    /// The embedding provider produced no vector, so nothing was written.
    #[error("embedding unavailable, entry not written")]
    EmbeddingUnavailable,

    /// Any other backend failure.
    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Tag catalog could not be read or written.
    #[error("tag catalog error: {0}")]
    Catalog(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this is a transient lock/busy condition worth retrying.
    pub fn is_contention(&self) -> bool {
        matches!(self, StoreError::Locked(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Locked(err.to_string())
            }
            _ => StoreError::Sqlite(err),
        }
    }
}
