//! # Note Source
//!
//! Read-only access to the note store that the vector index mirrors.
//!
//! ```text
//!            ┌────────────────────┐
//!            │  SourceRepository  │
//!            └─────────┬──────────┘
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌──────────────────┐   ┌──────────────────┐
//! │ SqliteRepository │   │InMemoryRepository│
//! │  (Memos `memo`)  │   │  (tests, demos)  │
//! └──────────────────┘   └──────────────────┘
//! ```
//!
//! [`SensitiveContentFilter`] lives here too: it gates both what gets
//! indexed and what retrieved content may be forwarded to a model.

pub mod document;
pub mod error;
pub mod memory;
pub mod repository;
pub mod sensitive;
pub mod sqlite;

pub use document::{DocId, DocStatus, Document, Visibility};
pub use error::{Result, SourceError};
pub use memory::InMemoryRepository;
pub use repository::{RecentScope, SourceRepository};
pub use sensitive::{SensitiveConfig, SensitiveContentFilter};
pub use sqlite::SqliteRepository;
