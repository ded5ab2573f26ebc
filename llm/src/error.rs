//! Error types for the generation capability.

use thiserror::Error;

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur while talking to a language model.
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key configured.
    #[error("language model not configured")]
    NotConfigured,

    /// The API returned a non-success status.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The API answered with something we could not use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A streamed response broke off or could not be decoded.
    #[error("stream error: {0}")]
    Stream(String),
}
