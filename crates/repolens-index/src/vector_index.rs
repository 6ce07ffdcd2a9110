//! Exact nearest-neighbour search over dense vectors.

use crate::error::{IndexError, Result};

/// In-memory vector index answering k-nearest-neighbour queries.
pub trait VectorIndex: Send + Sync {
    /// Replace the index content. Positions in later query results refer to
    /// the order of `vectors`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` if vectors disagree on length.
    fn build(&mut self, vectors: Vec<Vec<f32>>) -> Result<()>;

    /// Up to `k` `(position, distance)` pairs, nearest first.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` if `vector` has the wrong length.
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(usize, f32)>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension fixed by the last build, `None` while empty.
    fn dimension(&self) -> Option<usize>;
}

/// Brute-force index scored by squared Euclidean distance.
#[derive(Debug, Clone, Default)]
pub struct FlatL2Index {
    dimension: Option<usize>,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[must_use]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl VectorIndex for FlatL2Index {
    fn build(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
        self.vectors.clear();
        self.dimension = None;

        let Some(first) = vectors.first() else {
            return Ok(());
        };
        let dim = first.len();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(IndexError::DimensionMismatch {
                expected: dim,
                actual: bad.len(),
            });
        }

        self.dimension = Some(dim);
        self.vectors = vectors;
        Ok(())
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        let Some(dim) = self.dimension else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != dim {
            return Err(IndexError::DimensionMismatch {
                expected: dim,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, squared_l2(vector, v)))
            .collect();
        // Stable sort keeps equal distances in insertion order.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}
