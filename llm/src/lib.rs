//! # Generation Capability
//!
//! The language-model side of question answering, kept behind one trait so
//! retrieval can be tested with deterministic doubles.
//!
//! ```text
//! question ─► decide_tool ─► ToolChoice { SearchMemos | GetLatestMemos | NoTool }
//!                              │
//! retrieval ◄──────────────────┘
//!     │
//!     ├─► extract_keywords   (keyword fallback)
//!     ├─► validate_relevance (context gate)
//!     └─► generate_with_context / generate_without_context ─► TextStream
//! ```

pub mod capability;
pub mod config;
pub mod error;
pub mod openai;
pub mod tool;

pub use capability::{GenerationCapability, TextStream};
pub use config::LlmConfig;
pub use error::{LlmError, Result};
pub use openai::OpenAiChat;
pub use tool::{ToolChoice, ToolSchema, memo_tools};
