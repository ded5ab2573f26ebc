//! Durable sync watermark.
//!
//! A single file holding unix seconds as decimal text. Everything updated at
//! or before the stored second has been reconciled.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::Result;

/// Reads and commits the watermark file.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current watermark. Missing or unreadable files count as the epoch.
    pub async fn load(&self) -> DateTime<Utc> {
        let secs = match fs::read_to_string(&self.path).await {
            Ok(text) => match text.trim().parse::<i64>() {
                Ok(secs) => secs,
                Err(e) => {
                    warn!(
                        "Ignoring unreadable watermark in {}: {e}",
                        self.path.display()
                    );
                    0
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                warn!("Could not read watermark {}: {e}", self.path.display());
                0
            }
        };
        Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
    }

    /// Commit `at` (truncated to seconds) via a temporary file and a rename.
    pub async fn store(&self, at: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(at.timestamp().to_string().as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &self.path).await?;
        sync_parent(&self.path).await?;

        debug!("Watermark advanced to {}", at.timestamp());
        Ok(())
    }
}

/// Make the rename durable by syncing the containing directory.
#[cfg(unix)]
async fn sync_parent(path: &Path) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::File::open(parent).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_parent(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
