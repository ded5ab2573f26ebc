//! Error types for the note source.

use thiserror::Error;

use crate::document::DocId;

/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors that can occur while reading notes.
#[derive(Error, Debug)]
pub enum SourceError {
    /// A referenced note does not exist. Retrieval skips these.
    #[error("note not found: {0}")]
    NotFound(DocId),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row could not be mapped to a note.
    #[error("invalid row: {0}")]
    InvalidRow(String),
}
