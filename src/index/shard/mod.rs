
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::vector::Vector;
use crate::{IndexError, Result};

/// A chunk id with its inner-product score against a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub score: f32,
    pub ordinal: usize,
}

/// Exact (brute-force) inner-product index over one shard's vectors.
///
/// Ordinals are dense `0..len()` in insertion order and only meaningful for
/// this instance. Vectors are expected to be unit length already; the index
/// never normalizes.
#[derive(Debug, Clone)]
pub struct ShardIndex {
    dimension: usize,
    vectors: Vec<Vector>,
    chunk_ids: Vec<String>,
}

impl ShardIndex {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            chunk_ids: Vec::new(),
        }
    }

    /// New index holding `entries`, ordinals assigned in iteration order
    #[inline]
    pub fn from_entries<I>(dimension: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vector)>,
    {
        let mut index = Self::new(dimension);
        index.build(entries)?;
        Ok(index)
    }

    /// Replace the whole content. On a dimension mismatch nothing changes.
    #[inline]
    pub fn build<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, Vector)>,
    {
        let (chunk_ids, vectors): (Vec<String>, Vec<Vector>) = entries.into_iter().unzip();

        if let Some(bad) = vectors.iter().find(|v| v.dimension() != self.dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.dimension(),
            });
        }

        self.chunk_ids = chunk_ids;
        self.vectors = vectors;
        Ok(())
    }

    /// Add one vector at the next ordinal, which is returned
    #[inline]
    pub fn append(&mut self, chunk_id: impl Into<String>, vector: Vector) -> Result<usize> {
        self.check_dimension(&vector)?;

        let ordinal = self.vectors.len();
        self.chunk_ids.push(chunk_id.into());
        self.vectors.push(vector);
        Ok(ordinal)
    }

    /// Top `k` chunks by inner product, best first, ties going to the lowest ordinal
    #[inline]
    pub fn search(&self, query: &Vector, k: usize) -> Result<Vec<ScoredChunk>> {
        self.check_dimension(query)?;

        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(ordinal, vector)| (ordinal, query.dot(vector)))
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank);

        Ok(scored
            .into_iter()
            .map(|(ordinal, score)| ScoredChunk {
                chunk_id: self.chunk_ids[ordinal].clone(),
                score,
                ordinal,
            })
            .collect())
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Chunk ids in ordinal order
    #[inline]
    pub fn chunk_ids(&self) -> &[String] {
        &self.chunk_ids
    }

    #[inline]
    pub fn contains(&self, chunk_id: &str) -> bool {
        self.chunk_ids.iter().any(|id| id == chunk_id)
    }

    fn check_dimension(&self, vector: &Vector) -> Result<()> {
        if vector.dimension() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.dimension(),
            });
        }
        Ok(())
    }
}

// Score descending, then ordinal ascending
fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}
