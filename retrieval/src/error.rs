//! Error types for the retrieval layer.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while searching, browsing or logging feedback.
///
/// "Nothing found" is never an error; see [`SearchOutcome`](crate::SearchOutcome).
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Entry store error, including lock exhaustion.
    #[error("store error: {0}")]
    Store(#[from] faq_store::StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrievalError {
    /// Whether the store stayed locked through every retry.
    pub fn is_busy(&self) -> bool {
        matches!(self, RetrievalError::Store(faq_store::StoreError::Busy { .. }))
    }
}
