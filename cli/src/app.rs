//! Long-lived services shared by every command.

use std::sync::Arc;

use anyhow::{Context, Result};
use memos_embeddings::OpenAIProvider;
use memos_llm::OpenAiChat;
use memos_retrieval::RetrievalOrchestrator;
use memos_source::{SensitiveContentFilter, SqliteRepository};
use memos_sync::{SyncEngine, SyncLock, WatermarkStore};
use memos_vector_index::FlatVectorIndex;
use tracing::{info, warn};

use crate::config::AppConfig;

pub struct App {
    pub config: AppConfig,
    pub source: Arc<SqliteRepository>,
    pub index: Arc<FlatVectorIndex>,
    embedder: Arc<OpenAIProvider>,
    generator: Arc<OpenAiChat>,
    filter: SensitiveContentFilter,
}

impl App {
    /// Open the notes database and the persisted index.
    pub async fn open(config: AppConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("failed to create {}", config.data_dir.display()))?;

        let source = SqliteRepository::open(&config.db_path)
            .await
            .with_context(|| {
                format!("failed to open notes database {}", config.db_path.display())
            })?;
        let index = FlatVectorIndex::open(config.index_dir())
            .await
            .context("failed to open the vector index")?;
        info!(
            "Opened {} and the index in {}",
            config.db_path.display(),
            config.data_dir.display()
        );

        let embedder = OpenAIProvider::new(config.embedding.clone());
        if !embedder.is_available() {
            warn!("No embedding API key configured; syncs and searches will fail");
        }
        let generator = OpenAiChat::new(config.llm.clone());
        if !generator.is_available() {
            warn!("No chat API key configured; answers will fail");
        }
        let filter = SensitiveContentFilter::new(&config.sensitive);

        Ok(Self {
            config,
            source: Arc::new(source),
            index: Arc::new(index),
            embedder: Arc::new(embedder),
            generator: Arc::new(generator),
            filter,
        })
    }

    pub fn sync_engine(&self) -> SyncEngine {
        SyncEngine::new(
            self.source.clone(),
            self.embedder.clone(),
            self.index.clone(),
            WatermarkStore::new(self.config.watermark_path()),
        )
        .with_lock(SyncLock::with_file(self.config.sync_lock_path()))
        .with_filter(self.filter.clone())
        .with_config(self.config.sync.clone())
    }

    pub fn orchestrator(&self) -> RetrievalOrchestrator {
        RetrievalOrchestrator::new(
            self.embedder.clone(),
            self.index.clone(),
            self.source.clone(),
            self.generator.clone(),
        )
        .with_filter(self.filter.clone())
        .with_config(self.config.retrieval.clone())
    }

    pub async fn close(&self) {
        self.source.close().await;
    }
}
