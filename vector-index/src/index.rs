//! The vector index contract and its flat, file-backed implementation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use memos_embeddings::Embedding;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{IndexError, Result};
use crate::flat::{FlatTable, ScoredId};
use crate::persist;

/// Contract for an id-addressed embedding collection with exact search.
///
/// Every mutating call is all-or-nothing: either the whole batch becomes
/// visible (and durable, for persistent backends) or none of it does.
/// Concurrent searches observe the state before or after a mutation, never
/// a mix.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace vectors by id. Vectors are normalized to unit
    /// length before storage, so search scores are cosine similarities.
    ///
    /// Fails with [`IndexError::DimensionMismatch`] if any vector differs
    /// from the index dimension (fixed by the first stored vector).
    async fn add_or_update(&self, ids: &[String], vectors: &[Embedding]) -> Result<()>;

    /// Up to `k` hits by descending score. `k` larger than the index is
    /// clamped; an empty index yields an empty result.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredId>>;

    /// Remove `ids`, ignoring ids that are not present. Returns how many
    /// entries were removed.
    ///
    /// Cost depends on the backend. [`FlatVectorIndex`] has no native
    /// removal and rebuilds from the retained vectors: O(n * dimension) per
    /// call, so callers should batch deletions. Backends with native
    /// removal may do better without changing callers.
    async fn delete(&self, ids: &[String]) -> Result<usize>;

    /// Atomically replace the entire contents. An empty batch leaves an
    /// empty index with no fixed dimension.
    async fn replace_all(&self, ids: &[String], vectors: &[Embedding]) -> Result<()>;

    /// Every indexed id, in no particular order.
    async fn all_ids(&self) -> Vec<String>;

    /// Counters for status reporting.
    async fn stats(&self) -> IndexStats;

    /// Pick up state committed by another handle on the same storage.
    ///
    /// Writers sharing storage across processes call this after taking
    /// their exclusive lock, so they never commit on top of a stale view.
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

/// Summary of an index's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of stored vectors.
    pub vectors: usize,

    /// Fixed embedding dimension, if any vector has been stored.
    pub dimension: Option<usize>,

    /// Number of committed mutations since the index was created.
    pub generation: u64,
}

/// Exact inner-product index over a [`FlatTable`].
///
/// Mutations copy the current table, apply the change to the copy, persist
/// it, and only then publish it by swapping the shared snapshot. Readers
/// clone the snapshot `Arc` and search it without holding any lock.
pub struct FlatVectorIndex {
    /// Published snapshot.
    state: RwLock<Arc<FlatTable>>,

    /// Serializes writers; holds the last committed generation.
    writer: Mutex<u64>,

    /// Persistence directory. `None` keeps the index in memory only.
    dir: Option<PathBuf>,
}

impl FlatVectorIndex {
    /// An index that is never written to disk.
    pub fn ephemeral() -> Self {
        Self::from_table(FlatTable::new(), 0, None)
    }

    /// Open the index persisted in `dir`.
    ///
    /// Missing files start an empty index. Unreadable files are logged and
    /// also start an empty index (dimension unset); a full sync rebuilds it.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let (table, generation) = match persist::load(&dir).await {
            Ok(Some(persisted)) => {
                info!(
                    "Loaded vector index from {} ({} vectors)",
                    dir.display(),
                    persisted.table.len()
                );
                (persisted.table, persisted.generation)
            }
            Ok(None) => {
                info!("No vector index at {}, starting empty", dir.display());
                (FlatTable::new(), 0)
            }
            Err(IndexError::CorruptState(reason)) => {
                warn!(
                    "Ignoring corrupt vector index at {}: {reason}; run a full sync to rebuild",
                    dir.display()
                );
                (FlatTable::new(), 0)
            }
            Err(e) => return Err(e),
        };

        Ok(Self::from_table(table, generation, Some(dir)))
    }

    fn from_table(table: FlatTable, generation: u64, dir: Option<PathBuf>) -> Self {
        Self {
            state: RwLock::new(Arc::new(table)),
            writer: Mutex::new(generation),
            dir,
        }
    }

    /// Current snapshot.
    pub async fn snapshot(&self) -> Arc<FlatTable> {
        self.state.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.snapshot().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshot().await.is_empty()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.snapshot().await.contains(id)
    }

    pub async fn dimension(&self) -> Option<usize> {
        self.snapshot().await.dimension()
    }

    /// Persist `next` as the following generation, then publish it.
    async fn commit(&self, generation: &mut u64, next: FlatTable) -> Result<()> {
        let next_generation = *generation + 1;
        if let Some(dir) = &self.dir {
            persist::save(dir, &next, next_generation).await?;
        }
        *self.state.write().await = Arc::new(next);
        *generation = next_generation;
        Ok(())
    }
}

fn check_pairs(ids: &[String], vectors: &[Embedding]) -> Result<()> {
    if ids.len() != vectors.len() {
        return Err(IndexError::LengthMismatch {
            ids: ids.len(),
            vectors: vectors.len(),
        });
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for FlatVectorIndex {
    async fn add_or_update(&self, ids: &[String], vectors: &[Embedding]) -> Result<()> {
        check_pairs(ids, vectors)?;
        if ids.is_empty() {
            return Ok(());
        }

        let mut generation = self.writer.lock().await;
        let mut next = FlatTable::clone(&*self.snapshot().await);
        for (id, vector) in ids.iter().zip(vectors) {
            next.upsert(id, vector)?;
        }

        self.commit(&mut generation, next).await?;
        debug!("Upserted {} vectors", ids.len());
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredId>> {
        self.snapshot().await.search(query, k)
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        let mut generation = self.writer.lock().await;
        let current = self.snapshot().await;

        let removed: HashSet<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| current.contains(id))
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }

        let next = current.without(&removed);
        self.commit(&mut generation, next).await?;
        info!("Deleted {} vectors by rebuild", removed.len());
        Ok(removed.len())
    }

    async fn replace_all(&self, ids: &[String], vectors: &[Embedding]) -> Result<()> {
        check_pairs(ids, vectors)?;

        let mut generation = self.writer.lock().await;
        let mut next = FlatTable::new();
        for (id, vector) in ids.iter().zip(vectors) {
            next.upsert(id, vector)?;
        }

        self.commit(&mut generation, next).await?;
        info!("Replaced index contents with {} vectors", ids.len());
        Ok(())
    }

    async fn all_ids(&self) -> Vec<String> {
        self.snapshot().await.ids().to_vec()
    }

    async fn refresh(&self) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let mut generation = self.writer.lock().await;
        match persist::load(dir).await {
            Ok(Some(persisted)) if persisted.generation != *generation => {
                info!(
                    "Reloaded vector index generation {} from {} ({} vectors)",
                    persisted.generation,
                    dir.display(),
                    persisted.table.len()
                );
                *self.state.write().await = Arc::new(persisted.table);
                *generation = persisted.generation;
            }
            Ok(_) => {}
            Err(IndexError::CorruptState(reason)) => {
                warn!(
                    "Keeping in-memory vector index, {} is unreadable: {reason}",
                    dir.display()
                );
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn stats(&self) -> IndexStats {
        let generation = *self.writer.lock().await;
        let snapshot = self.snapshot().await;
        IndexStats {
            vectors: snapshot.len(),
            dimension: snapshot.dimension(),
            generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let index = FlatVectorIndex::ephemeral();
        index
            .add_or_update(
                &ids(&["1", "2"]),
                &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            )
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.1, 0.0], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_batch_with_bad_dimension_is_rejected_whole() {
        let index = FlatVectorIndex::ephemeral();
        index
            .add_or_update(&ids(&["1"]), &[vec![1.0, 0.0]])
            .await
            .unwrap();

        let err = index
            .add_or_update(&ids(&["2", "3"]), &[vec![0.0, 1.0], vec![1.0, 1.0, 1.0]])
            .await
            .unwrap_err();

        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
        assert_eq!(index.all_ids().await, ids(&["1"]));
    }

    #[tokio::test]
    async fn test_length_mismatch() {
        let index = FlatVectorIndex::ephemeral();
        let err = index
            .add_or_update(&ids(&["1", "2"]), &[vec![1.0]])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::LengthMismatch { ids: 2, vectors: 1 }));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let index = FlatVectorIndex::ephemeral();
        index
            .add_or_update(&ids(&["1", "2"]), &[vec![1.0, 0.0], vec![0.0, 1.0]])
            .await
            .unwrap();

        assert_eq!(index.delete(&ids(&["1"])).await.unwrap(), 1);
        assert_eq!(index.delete(&ids(&["1"])).await.unwrap(), 0);

        let hits = index.search(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "2");
    }

    #[tokio::test]
    async fn test_replace_all_resets_dimension() {
        let index = FlatVectorIndex::ephemeral();
        index
            .add_or_update(&ids(&["1"]), &[vec![1.0, 0.0]])
            .await
            .unwrap();
        index
            .replace_all(&ids(&["9"]), &[vec![0.0, 0.0, 1.0]])
            .await
            .unwrap();

        assert_eq!(index.all_ids().await, ids(&["9"]));
        assert_eq!(index.dimension().await, Some(3));
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let index = FlatVectorIndex::open(dir.path()).await.unwrap();
            index
                .add_or_update(
                    &ids(&["1", "2", "3"]),
                    &[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
                )
                .await
                .unwrap();
            index.delete(&ids(&["2"])).await.unwrap();
        }

        let reopened = FlatVectorIndex::open(dir.path()).await.unwrap();
        let mut all = reopened.all_ids().await;
        all.sort();
        assert_eq!(all, ids(&["1", "3"]));
        assert_eq!(
            reopened.stats().await,
            IndexStats {
                vectors: 2,
                dimension: Some(2),
                generation: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_refresh_sees_other_handle_commits() {
        let dir = TempDir::new().unwrap();
        let first = FlatVectorIndex::open(dir.path()).await.unwrap();
        let second = FlatVectorIndex::open(dir.path()).await.unwrap();

        first
            .add_or_update(&ids(&["1", "2"]), &[vec![1.0, 0.0], vec![0.0, 1.0]])
            .await
            .unwrap();
        assert!(second.is_empty().await);

        second.refresh().await.unwrap();
        second
            .add_or_update(&ids(&["3"]), &[vec![1.0, 1.0]])
            .await
            .unwrap();
        assert_eq!(second.stats().await.generation, 2);

        let reopened = FlatVectorIndex::open(dir.path()).await.unwrap();
        let mut all = reopened.all_ids().await;
        all.sort();
        assert_eq!(all, ids(&["1", "2", "3"]));
    }

    #[tokio::test]
    async fn test_refresh_is_noop_for_ephemeral() {
        let index = FlatVectorIndex::ephemeral();
        index
            .add_or_update(&ids(&["1"]), &[vec![1.0, 0.0]])
            .await
            .unwrap();
        index.refresh().await.unwrap();
        assert_eq!(index.all_ids().await, ids(&["1"]));
    }

    #[tokio::test]
    async fn test_corrupt_files_open_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(persist::manifest_path(dir.path()), b"garbage").unwrap();

        let index = FlatVectorIndex::open(dir.path()).await.unwrap();
        assert!(index.is_empty().await);
        assert_eq!(index.dimension().await, None);

        index
            .add_or_update(&ids(&["1"]), &[vec![0.5, 0.5]])
            .await
            .unwrap();
        assert!(index.contains("1").await);
    }

    #[tokio::test]
    async fn test_search_sees_whole_snapshots() {
        let index = Arc::new(FlatVectorIndex::ephemeral());
        let all: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        let vectors: Vec<Embedding> = (0..50).map(|i| vec![1.0, i as f32]).collect();
        index.add_or_update(&all, &vectors).await.unwrap();

        let writer = {
            let index = index.clone();
            let doomed = all[..25].to_vec();
            tokio::spawn(async move { index.delete(&doomed).await })
        };

        for _ in 0..20 {
            let hits = index.search(&[1.0, 0.0], 100).await.unwrap();
            assert!(hits.len() == 50 || hits.len() == 25, "saw {} hits", hits.len());
        }
        writer.await.unwrap().unwrap();
        assert_eq!(index.len().await, 25);
    }
}
