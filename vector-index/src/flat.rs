//! Exact, append-only flat vector table.
//!
//! Vectors live in one contiguous buffer addressed by dense position. The
//! table can append and overwrite a position but has no native removal;
//! [`FlatTable::without`] produces a renumbered copy instead.

use std::collections::{HashMap, HashSet};

use memos_embeddings::{dot, normalize, top_k};

use crate::error::{IndexError, Result};

/// A search hit: external id and cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
}

/// Contiguous storage of unit-length vectors with a dense position map.
#[derive(Debug, Clone, Default)]
pub struct FlatTable {
    /// Fixed once the first vector is stored.
    dimension: Option<usize>,

    /// `len() * dimension` floats, row-major.
    data: Vec<f32>,

    /// Position -> external id.
    ids: Vec<String>,

    /// External id -> position. Inverse of `ids`.
    positions: HashMap<String, usize>,
}

impl FlatTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table that already enforces `dimension`.
    pub fn with_dimension(dimension: Option<usize>) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    /// Rebuild a table from persisted parts, validating every invariant.
    pub fn from_parts(dimension: Option<usize>, ids: Vec<String>, data: Vec<f32>) -> Result<Self> {
        let expected_len = ids.len() * dimension.unwrap_or(0);
        if data.len() != expected_len {
            return Err(IndexError::CorruptState(format!(
                "{} ids need {expected_len} floats, found {}",
                ids.len(),
                data.len()
            )));
        }
        if dimension.is_none() && !ids.is_empty() {
            return Err(IndexError::CorruptState(
                "entries present without a dimension".to_string(),
            ));
        }

        let mut positions = HashMap::with_capacity(ids.len());
        for (position, id) in ids.iter().enumerate() {
            if positions.insert(id.clone(), position).is_some() {
                return Err(IndexError::CorruptState(format!("duplicate id {id}")));
            }
        }

        Ok(Self {
            dimension,
            data,
            ids,
            positions,
        })
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// External ids in dense-position order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Raw row-major vector buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Stored (normalized) vector for `id`.
    pub fn vector(&self, id: &str) -> Option<&[f32]> {
        let dimension = self.dimension?;
        let position = *self.positions.get(id)?;
        self.data
            .get(position * dimension..(position + 1) * dimension)
    }

    /// Check a vector against the table dimension without mutating.
    pub fn check(&self, id: &str, vector: &[f32]) -> Result<()> {
        if vector.is_empty() {
            return Err(IndexError::InvalidVector {
                id: id.to_string(),
                reason: "empty vector".to_string(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(IndexError::InvalidVector {
                id: id.to_string(),
                reason: "non-finite component".to_string(),
            });
        }
        match self.dimension {
            Some(expected) if expected != vector.len() => Err(IndexError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Insert or overwrite `id`. The vector is normalized before storage.
    pub fn upsert(&mut self, id: &str, vector: &[f32]) -> Result<()> {
        self.check(id, vector)?;
        let dimension = *self.dimension.get_or_insert(vector.len());

        let mut unit = vector.to_vec();
        normalize(&mut unit);

        match self.positions.get(id) {
            Some(&position) => {
                self.data[position * dimension..(position + 1) * dimension]
                    .copy_from_slice(&unit);
            }
            None => {
                self.positions.insert(id.to_string(), self.ids.len());
                self.ids.push(id.to_string());
                self.data.extend_from_slice(&unit);
            }
        }
        Ok(())
    }

    /// Exact top-`k` search by inner product against the normalized query.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredId>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let mut unit = query.to_vec();
        normalize(&mut unit);

        let scores = self
            .data
            .chunks_exact(dimension)
            .enumerate()
            .map(|(position, row)| (position, dot(&unit, row)));

        Ok(top_k(scores, k.min(self.len()))
            .into_iter()
            .map(|(position, score)| ScoredId {
                id: self.ids[position].clone(),
                score,
            })
            .collect())
    }

    /// Copy of this table without `removed`, positions renumbered densely.
    ///
    /// O(n * dimension): every retained vector is copied.
    pub fn without(&self, removed: &HashSet<&str>) -> Self {
        let mut rebuilt = Self::with_dimension(self.dimension);
        let Some(dimension) = self.dimension else {
            return rebuilt;
        };

        for (id, row) in self.ids.iter().zip(self.data.chunks_exact(dimension)) {
            if removed.contains(id.as_str()) {
                continue;
            }
            rebuilt.positions.insert(id.clone(), rebuilt.ids.len());
            rebuilt.ids.push(id.clone());
            rebuilt.data.extend_from_slice(row);
        }
        rebuilt
    }
}
