//! Reconciliation of the vector index with the note store.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use memos_embeddings::{Embedding, EmbeddingProvider};
use memos_source::{DocId, Document, SensitiveContentFilter, SourceRepository, Visibility};
use memos_vector_index::VectorIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SyncError};
use crate::lock::SyncLock;
use crate::watermark::WatermarkStore;

/// Sync tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Notes embedded per provider call.
    pub batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { batch_size: 64 }
    }
}

impl SyncConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Which kind of sync to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Only notes changed since the watermark, plus deletions.
    Incremental,
    /// Rebuild the whole index from the active notes.
    Full,
}

/// What a completed sync did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    /// Notes embedded and written to the index.
    pub indexed: usize,
    /// Ids removed from the index.
    pub deleted: usize,
    /// Changed notes withheld because they are sensitive.
    pub skipped_sensitive: usize,
    /// Watermark committed by this run.
    pub watermark: DateTime<Utc>,
}

/// A single-note notification from the ingestion transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    /// A note was created or edited.
    Upsert {
        id: DocId,
        content: String,
        visibility: Visibility,
    },
    /// A note was deleted.
    Delete { id: DocId },
}

/// What [`SyncEngine::apply_event`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Indexed,
    /// Removed from the index, or confirmed absent.
    Removed,
}

/// Makes the vector index match the active, non-sensitive notes.
///
/// Syncs and ingestion events share one gate. A sync that finds the gate
/// held fails with [`SyncError::Conflict`]; an ingestion event waits. The
/// gate is a [`SyncLock`] on a file next to the watermark, so engines in
/// different processes exclude each other too. Whoever takes the gate
/// refreshes the index from storage before reading it.
pub struct SyncEngine {
    source: Arc<dyn SourceRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    filter: SensitiveContentFilter,
    watermark: WatermarkStore,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    gate: SyncLock,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn SourceRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        watermark: WatermarkStore,
    ) -> Self {
        let gate = SyncLock::with_file(watermark.path().with_extension("lock"));
        Self {
            source,
            embedder,
            index,
            filter: SensitiveContentFilter::default(),
            watermark,
            clock: Arc::new(SystemClock),
            config: SyncConfig::default(),
            gate,
        }
    }

    pub fn with_lock(mut self, gate: SyncLock) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_filter(mut self, filter: SensitiveContentFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// The committed watermark.
    pub async fn watermark(&self) -> DateTime<Utc> {
        self.watermark.load().await
    }

    pub async fn run(&self, mode: SyncMode) -> Result<SyncReport> {
        match mode {
            SyncMode::Incremental => self.incremental_sync().await,
            SyncMode::Full => self.full_sync().await,
        }
    }

    /// Bring the index up to date with notes changed since the watermark.
    ///
    /// Deletions are applied before upserts. The watermark advances to the
    /// sync start time only after every index mutation has succeeded.
    pub async fn incremental_sync(&self) -> Result<SyncReport> {
        let _guard = self.gate.try_acquire().await?.ok_or(SyncError::Conflict)?;
        self.index.refresh().await?;
        let started = self.start_time();
        let since = self.watermark.load().await;
        info!("Incremental sync from watermark {}", since.timestamp());

        let changed = self.source.list_changed_since(since).await?;
        let active_ids: HashSet<String> = self
            .source
            .list_active()
            .await?
            .into_iter()
            .map(|doc| doc.id.into_string())
            .collect();
        let indexed: HashSet<String> = self.index.all_ids().await.into_iter().collect();

        let mut deleted: BTreeSet<String> = indexed.difference(&active_ids).cloned().collect();
        let mut upserts = Vec::new();
        let mut skipped_sensitive = 0;
        for doc in changed {
            if !doc.is_active() {
                continue;
            }
            if self.filter.is_sensitive(&doc.content) {
                debug!("Withholding sensitive note {}", doc.id);
                skipped_sensitive += 1;
                if indexed.contains(doc.id.as_str()) {
                    deleted.insert(doc.id.into_string());
                }
                continue;
            }
            upserts.push(doc);
        }

        let deleted: Vec<String> = deleted.into_iter().collect();
        let removed = self.index.delete(&deleted).await?;
        let indexed = self.embed_and_upsert(&upserts).await?;

        self.watermark.store(started).await?;
        info!(
            "Incremental sync done: {indexed} indexed, {removed} deleted, {skipped_sensitive} sensitive skipped"
        );
        Ok(SyncReport {
            mode: SyncMode::Incremental,
            indexed,
            deleted: removed,
            skipped_sensitive,
            watermark: started,
        })
    }

    /// Rebuild the index from every active, non-sensitive note.
    ///
    /// The replacement is built off to the side and committed in one step,
    /// so an aborted run leaves the previous index and watermark in place.
    pub async fn full_sync(&self) -> Result<SyncReport> {
        let _guard = self.gate.try_acquire().await?.ok_or(SyncError::Conflict)?;
        self.index.refresh().await?;
        let started = self.start_time();
        info!("Full sync started");

        let previous = self.index.all_ids().await;
        let (docs, sensitive): (Vec<Document>, Vec<Document>) = self
            .source
            .list_active()
            .await?
            .into_iter()
            .partition(|doc| !self.filter.is_sensitive(&doc.content));

        let mut ids = Vec::with_capacity(docs.len());
        let mut vectors = Vec::with_capacity(docs.len());
        for batch in docs.chunks(self.batch_size()) {
            ids.extend(batch.iter().map(|doc| doc.id.to_string()));
            vectors.extend(self.embed_batch(batch).await?);
        }
        self.index.replace_all(&ids, &vectors).await?;

        self.watermark.store(started).await?;
        let kept: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let deleted = previous
            .iter()
            .filter(|id| !kept.contains(id.as_str()))
            .count();
        info!(
            "Full sync done: {} indexed, {deleted} deleted, {} sensitive skipped",
            ids.len(),
            sensitive.len()
        );
        Ok(SyncReport {
            mode: SyncMode::Full,
            indexed: ids.len(),
            deleted,
            skipped_sensitive: sensitive.len(),
            watermark: started,
        })
    }

    /// Apply one ingestion event, waiting for any running sync to finish.
    ///
    /// Upserts of private, non-sensitive notes are embedded and indexed;
    /// anything else removes the note from the index.
    pub async fn apply_event(&self, event: IngestEvent) -> Result<IngestOutcome> {
        let _guard = self.gate.acquire().await?;
        self.index.refresh().await?;

        match event {
            IngestEvent::Upsert {
                id,
                content,
                visibility,
            } if visibility == Visibility::Private && !self.filter.is_sensitive(&content) => {
                let vector = self.embedder.embed_one(&content).await?;
                self.index
                    .add_or_update(&[id.to_string()], &[vector])
                    .await?;
                debug!("Indexed note {id} from ingestion");
                Ok(IngestOutcome::Indexed)
            }
            IngestEvent::Upsert { id, .. } | IngestEvent::Delete { id } => {
                let removed = self.index.delete(&[id.to_string()]).await?;
                debug!("Removed note {id} from ingestion ({removed} entries)");
                Ok(IngestOutcome::Removed)
            }
        }
    }

    fn start_time(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size.max(1)
    }

    async fn embed_batch(&self, docs: &[Document]) -> Result<Vec<Embedding>> {
        let texts: Vec<String> = docs.iter().map(|doc| doc.content.clone()).collect();
        self.embedder.embed(&texts).await.map_err(SyncError::from)
    }

    /// Embed and index `docs` batch by batch. Returns how many were written.
    async fn embed_and_upsert(&self, docs: &[Document]) -> Result<usize> {
        for batch in docs.chunks(self.batch_size()) {
            let ids: Vec<String> = batch.iter().map(|doc| doc.id.to_string()).collect();
            let vectors = self.embed_batch(batch).await?;
            self.index.add_or_update(&ids, &vectors).await?;
        }
        Ok(docs.len())
    }
}
