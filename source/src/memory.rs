//! In-process note store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::document::{DocId, Document};
use crate::error::Result;
use crate::repository::{RecentScope, SourceRepository, usable_keywords};

/// A [`SourceRepository`] held in memory, ordered by id.
///
/// Used by tests and local demos; behaves like the SQLite repository.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    docs: RwLock<BTreeMap<DocId, Document>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository holding `docs`.
    pub fn with_documents(docs: impl IntoIterator<Item = Document>) -> Self {
        Self {
            docs: RwLock::new(docs.into_iter().map(|d| (d.id.clone(), d)).collect()),
        }
    }

    /// Insert or replace a note.
    pub async fn upsert(&self, doc: Document) {
        self.docs.write().await.insert(doc.id.clone(), doc);
    }

    /// Remove a note, returning it if present.
    pub async fn remove(&self, id: &DocId) -> Option<Document> {
        self.docs.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

#[async_trait]
impl SourceRepository for InMemoryRepository {
    async fn get_by_id(&self, id: &DocId) -> Result<Option<Document>> {
        Ok(self.docs.read().await.get(id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Document>> {
        Ok(self
            .docs
            .read()
            .await
            .values()
            .filter(|d| d.is_active())
            .cloned()
            .collect())
    }

    async fn list_changed_since(&self, since: DateTime<Utc>) -> Result<Vec<Document>> {
        Ok(self
            .docs
            .read()
            .await
            .values()
            .filter(|d| d.updated_at > since)
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: usize, scope: RecentScope) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .docs
            .read()
            .await
            .values()
            .filter(|d| scope == RecentScope::Unfiltered || d.is_active())
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs.truncate(limit);
        Ok(docs)
    }

    async fn find_by_keywords(&self, keywords: &[String], limit: usize) -> Result<Vec<Document>> {
        let keywords = usable_keywords(keywords);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .docs
            .read()
            .await
            .values()
            .filter(|d| d.is_active() && keywords.iter().any(|k| d.content.contains(k)))
            .take(limit)
            .cloned()
            .collect())
    }
}
