//! # Embeddings
//!
//! Text-to-vector providers and the vector math used by the memo index.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings                                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Vec<Embedding> ──► normalize / dot      │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  OpenAIProvider / HashingProvider                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod hashing;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use hashing::HashingProvider;
pub use provider::{EmbeddingConfig, EmbeddingProvider, OpenAIProvider};
pub use similarity::{cosine_similarity, dot, normalize, normalized, top_k};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
