//! Exclusion between syncs and ingestion events.
//!
//! Callers in one process queue on a mutex. Other processes are kept out by
//! an OS advisory lock on a file, which the kernel releases when the holder
//! exits, crashed or not.

use std::fs::TryLockError;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::Result;

/// A lock shared by every writer of one index.
#[derive(Debug)]
pub struct SyncLock {
    local: Mutex<()>,
    path: Option<PathBuf>,
}

/// Held for the duration of a sync or ingestion event.
#[derive(Debug)]
pub struct SyncLockGuard<'a> {
    _local: MutexGuard<'a, ()>,
    _file: Option<std::fs::File>,
}

impl SyncLock {
    /// Exclusion within this process only.
    pub fn in_process() -> Self {
        Self {
            local: Mutex::new(()),
            path: None,
        }
    }

    /// Exclusion across every process that locks `path`.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            local: Mutex::new(()),
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Take the lock if nobody holds it. `Ok(None)` means it is busy.
    pub async fn try_acquire(&self) -> Result<Option<SyncLockGuard<'_>>> {
        let Ok(local) = self.local.try_lock() else {
            return Ok(None);
        };

        let file = match &self.path {
            Some(path) => {
                let file = open_lock_file(path).await?;
                match file.try_lock() {
                    Ok(()) => Some(file),
                    Err(TryLockError::WouldBlock) => {
                        debug!("{} is held by another process", path.display());
                        return Ok(None);
                    }
                    Err(TryLockError::Error(e)) => return Err(e.into()),
                }
            }
            None => None,
        };

        Ok(Some(SyncLockGuard {
            _local: local,
            _file: file,
        }))
    }

    /// Wait until the lock is free, then take it.
    pub async fn acquire(&self) -> Result<SyncLockGuard<'_>> {
        let local = self.local.lock().await;

        let file = match &self.path {
            Some(path) => {
                let file = open_lock_file(path).await?;
                let file = tokio::task::spawn_blocking(move || {
                    file.lock()?;
                    Ok::<_, std::io::Error>(file)
                })
                .await
                .map_err(std::io::Error::other)??;
                Some(file)
            }
            None => None,
        };

        Ok(SyncLockGuard {
            _local: local,
            _file: file,
        })
    }
}

async fn open_lock_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .await?;
    Ok(file.into_std().await)
}
