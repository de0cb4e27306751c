//! Error types for search backend calls.

use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur talking to the search backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport or connection failure.
    #[error("search backend unavailable: {0}")]
    Unavailable(String),

    /// A mapping contradicts the one already stored for the document type.
    #[error("schema conflict for {doc_type}: {reason}")]
    SchemaConflict { doc_type: String, reason: String },

    /// Non-success status the call does not absorb.
    #[error("search backend returned {status}: {body}")]
    Http { status: u16, body: String },

    /// The backend answered with something we could not interpret.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
