//! Application configuration.
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. The TOML config file
//! 3. Environment variables (`MEMOS_*`), including those set by `.env`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memos_embeddings::EmbeddingConfig;
use memos_llm::LlmConfig;
use memos_retrieval::RetrievalConfig;
use memos_source::SensitiveConfig;
use memos_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

const APP_DIR: &str = "memos-assistant";

pub const ENV_OPENAI_API_KEY: &str = "MEMOS_OPENAI_API_KEY";
pub const ENV_EMBEDDING_API_KEY: &str = "MEMOS_EMBEDDING_API_KEY";
pub const ENV_DB_PATH: &str = "MEMOS_DB_PATH";
pub const ENV_DATA_DIR: &str = "MEMOS_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The Memos SQLite database. Opened read-only.
    pub db_path: PathBuf,

    /// Holds the vector index and the sync watermark.
    pub data_dir: PathBuf,

    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub sync: SyncConfig,
    pub sensitive: SensitiveConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(".memos-assistant"));
        Self {
            db_path: data_dir.join("memos_prod.db"),
            data_dir,
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            sync: SyncConfig::default(),
            sensitive: SensitiveConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse TOML")
    }

    /// Apply environment overrides. The chat key doubles as the embedding
    /// key unless a separate one is set.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = lookup(ENV_OPENAI_API_KEY) {
            if self.embedding.api_key.is_none() {
                self.embedding.api_key = Some(key.clone());
            }
            self.llm.api_key = Some(key);
        }
        if let Some(key) = lookup(ENV_EMBEDDING_API_KEY) {
            self.embedding.api_key = Some(key);
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    pub fn watermark_path(&self) -> PathBuf {
        self.data_dir.join("last_sync")
    }

    /// Held by every `sync` run for its whole duration.
    pub fn sync_lock_path(&self) -> PathBuf {
        self.data_dir.join("sync.lock")
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}
