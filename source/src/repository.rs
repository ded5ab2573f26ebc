//! Read interface to the note store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{DocId, Document};
use crate::error::Result;

/// Which notes [`SourceRepository::list_recent`] may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecentScope {
    /// Only active, private notes.
    #[default]
    ActiveOnly,
    /// Every note regardless of status or visibility.
    Unfiltered,
}

/// Read-only view of the note store.
///
/// "Active" always means active *and* private: the only notes that may be
/// indexed or used as keyword hits.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Look up one note regardless of status.
    async fn get_by_id(&self, id: &DocId) -> Result<Option<Document>>;

    /// Every active note.
    async fn list_active(&self) -> Result<Vec<Document>>;

    /// Every note (any status) with `updated_at` strictly after `since`.
    async fn list_changed_since(&self, since: DateTime<Utc>) -> Result<Vec<Document>>;

    /// Up to `limit` notes by creation time, newest first.
    async fn list_recent(&self, limit: usize, scope: RecentScope) -> Result<Vec<Document>>;

    /// Up to `limit` active notes whose content contains any of `keywords`
    /// (case-sensitive substring, OR semantics). Empty keywords never match.
    async fn find_by_keywords(&self, keywords: &[String], limit: usize) -> Result<Vec<Document>>;
}

/// Keywords that can actually match something.
pub(crate) fn usable_keywords(keywords: &[String]) -> Vec<&str> {
    keywords
        .iter()
        .map(String::as_str)
        .filter(|k| !k.is_empty())
        .collect()
}
