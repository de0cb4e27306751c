//! Error types for the engine.

use indexsync_backend::BackendError;
use indexsync_model::ModelError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Type graph or document conversion error.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Search backend error.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Object store error.
    #[error("object store error: {0}")]
    Store(String),

    /// A search hit the engine cannot map back to an object.
    #[error("invalid search hit: {0}")]
    InvalidHit(String),
}
