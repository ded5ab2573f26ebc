//! Error types for the vector index.

use thiserror::Error;

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur in the vector index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// A vector does not match the index dimension. Indicates a
    /// configuration bug (e.g. the embedding model changed) and rejects the
    /// whole operation.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Ids and vectors were not paired one-to-one.
    #[error("got {ids} ids but {vectors} vectors")]
    LengthMismatch { ids: usize, vectors: usize },

    /// A vector that can never be stored (empty or non-finite).
    #[error("invalid vector for {id}: {reason}")]
    InvalidVector { id: String, reason: String },

    /// Persisted index files could not be decoded.
    #[error("corrupt persisted state: {0}")]
    CorruptState(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
