//! Error types for synchronization.

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while reconciling the index with the note store.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Another sync or ingestion event holds the lock, possibly in another
    /// process. Not retried; the caller decides.
    #[error("a sync is already in progress")]
    Conflict,

    /// Embedding error. Aborts the run and leaves the watermark unchanged.
    #[error("embedding error: {0}")]
    Embedding(#[from] memos_embeddings::EmbeddingError),

    /// Vector index error.
    #[error("index error: {0}")]
    Index(#[from] memos_vector_index::IndexError),

    /// Note store error.
    #[error("source error: {0}")]
    Source(#[from] memos_source::SourceError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
