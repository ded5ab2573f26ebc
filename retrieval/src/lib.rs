//! # Retrieval
//!
//! Answers questions from the user's notes by combining vector search with
//! a keyword fallback, optionally routed by the model to a listing of the
//! latest notes instead.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     RetrievalOrchestrator                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  question ─► decide_tool                                        │
//! │                 │                                               │
//! │       ┌─────────┴──────────┐                                    │
//! │       ▼                    ▼                                    │
//! │  ┌──────────┐        ┌──────────────┐                           │
//! │  │  latest  │        │    search    │                           │
//! │  │ (source) │        │ 1. semantic  │ embed ─► VectorIndex      │
//! │  └──────────┘        │ 2. keywords  │ if top score < threshold  │
//! │       │              │ 3. merge     │ keyword hits first        │
//! │       │              └──────────────┘                           │
//! │       └─────────┬──────────┘                                    │
//! │                 ▼                                               │
//! │   context (sensitive notes dropped) ─► relevance check          │
//! │                 │                                               │
//! │                 ▼                                               │
//! │   streamed answer: notes-grounded or general knowledge          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use memos_retrieval::RetrievalOrchestrator;
//!
//! let orchestrator = RetrievalOrchestrator::new(embedder, index, source, generator)
//!     .with_filter(filter)
//!     .with_config(config);
//!
//! let answer = orchestrator.answer("How do I renew the K3S certificate?").await?;
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;

pub use config::{LatestMemosScope, RetrievalConfig};
pub use context::{AssembledContext, Provenance, SearchResult, assemble_context};
pub use engine::{Answer, GENERAL_KNOWLEDGE_NOTICE, Grounding, RetrievalOrchestrator};
pub use error::{Result, RetrievalError};
