//! Error types for the model layer.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or querying the type graph.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A type name that was never registered.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// The same type name was registered twice.
    #[error("type registered twice: {0}")]
    DuplicateType(String),

    /// A type names a parent that has not been registered before it.
    #[error("type {type_name} names unregistered parent {parent}")]
    UnknownParent { type_name: String, parent: String },

    /// The type has no indexed root and cannot produce documents.
    #[error("type is not indexable: {0}")]
    NotIndexable(String),

    /// A document was requested for an object the store has not assigned an id yet.
    #[error("object of type {0} has no id")]
    MissingId(String),
}
