//! Search results and the context handed to the generation capability.

use chrono::{DateTime, SecondsFormat, Utc};
use memos_source::{DocId, Document, SensitiveContentFilter};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which phase produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Vector search.
    Semantic,
    /// Keyword fallback. Scored 0.
    Keyword,
    /// Latest-notes listing. Scored 0.
    Recent,
}

/// A note selected for an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: DocId,
    pub score: f32,
    pub provenance: Provenance,
    /// Content at retrieval time.
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SearchResult {
    pub fn from_document(doc: Document, score: f32, provenance: Provenance) -> Self {
        Self {
            id: doc.id,
            score,
            provenance,
            content: doc.content,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// Notes that may be shown to a model, and the prompt context built from them.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    pub notes: Vec<SearchResult>,
    pub text: String,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Drop sensitive notes and render the rest, one block per note.
pub fn assemble_context(
    results: Vec<SearchResult>,
    filter: &SensitiveContentFilter,
) -> AssembledContext {
    let notes: Vec<SearchResult> = results
        .into_iter()
        .filter(|note| {
            let sensitive = filter.is_sensitive(&note.content);
            if sensitive {
                debug!("Keeping sensitive note {} out of the context", note.id);
            }
            !sensitive
        })
        .collect();

    let text = notes
        .iter()
        .map(|note| {
            format!(
                "Note (ID: {}, Created: {}):\n{}",
                note.id,
                note.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                note.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    AssembledContext { notes, text }
}
