//! The note model shared by every crate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External note id.
///
/// Memos uses integer ids; they are rendered in decimal so that integer and
/// string ids share one key space in the vector index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for DocId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for DocId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<DocId> for String {
    fn from(id: DocId) -> Self {
        id.0
    }
}

/// Lifecycle state of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocStatus {
    /// Live note (`NORMAL` in Memos).
    Active,
    /// Archived or otherwise removed from normal use.
    Archived,
}

impl DocStatus {
    /// Map a Memos `row_status` value. Anything but `NORMAL` is archived.
    pub fn from_row_status(value: &str) -> Self {
        if value.eq_ignore_ascii_case("NORMAL") {
            Self::Active
        } else {
            Self::Archived
        }
    }
}

/// Who may see a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Protected,
    Public,
}

impl Visibility {
    /// Map a Memos `visibility` value.
    pub fn from_column(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "PRIVATE" => Some(Self::Private),
            "PROTECTED" => Some(Self::Protected),
            "PUBLIC" => Some(Self::Public),
            _ => None,
        }
    }
}

/// A note as read from the source store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: DocStatus,
    pub visibility: Visibility,
}

impl Document {
    /// A new active, private note with both timestamps set to `at`.
    pub fn new(id: impl Into<DocId>, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            created_at: at,
            updated_at: at,
            status: DocStatus::Active,
            visibility: Visibility::Private,
        }
    }

    pub fn with_status(mut self, status: DocStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self
    }

    /// Whether the note belongs to the indexable set: active and private.
    pub fn is_active(&self) -> bool {
        self.status == DocStatus::Active && self.visibility == Visibility::Private
    }
}
