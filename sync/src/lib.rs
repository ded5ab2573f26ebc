//! # Index Synchronization
//!
//! Keeps the vector index a faithful mirror of the active, non-sensitive
//! notes in the source store.
//!
//! ```text
//!  SourceRepository ──list_changed_since(watermark)──┐
//!                   ──list_active────────────────────┤
//!                                                    ▼
//!                       SensitiveContentFilter ─► SyncEngine ─► EmbeddingProvider
//!                                                    │
//!                      delete(stale) ◄───────────────┤
//!                      add_or_update(changed) ◄──────┤
//!                      WatermarkStore.store(start) ◄─┘  (only after success)
//! ```
//!
//! Ingestion events take the same path for a single note. Both run under a
//! [`SyncLock`] so only one writer touches the index at a time, across
//! processes.

pub mod clock;
pub mod engine;
pub mod error;
pub mod lock;
pub mod watermark;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{IngestEvent, IngestOutcome, SyncConfig, SyncEngine, SyncMode, SyncReport};
pub use error::{Result, SyncError};
pub use lock::{SyncLock, SyncLockGuard};
pub use watermark::WatermarkStore;
