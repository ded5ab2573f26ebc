//! Error types for retrieval.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that fail a retrieval outright.
///
/// Degraded paths (keyword fallback, relevance check) never surface here;
/// an error means the search itself failed, as opposed to finding nothing.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The query could not be embedded.
    #[error("embedding error: {0}")]
    Embedding(#[from] memos_embeddings::EmbeddingError),

    /// Vector index error.
    #[error("index error: {0}")]
    Index(#[from] memos_vector_index::IndexError),

    /// Note store error.
    #[error("source error: {0}")]
    Source(#[from] memos_source::SourceError),

    /// The answer could not be generated.
    #[error("generation error: {0}")]
    Generation(#[from] memos_llm::LlmError),
}
