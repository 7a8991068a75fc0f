use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};
use super::sparse::{cosine_distance_with_norms, SparseVector};

/// One TF-IDF row per catalog entry, in catalog order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorMatrix {
    rows: Vec<SparseVector>,
}

impl VectorMatrix {
    pub fn from_rows(rows: Vec<SparseVector>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    pub fn row(&self, row_index: usize) -> Option<&SparseVector> {
        self.rows.get(row_index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A neighbor returned by [`NeighborIndex::search`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub row_index: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Cosine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    BruteForce,
}

/// Exact k-nearest-neighbor index over a [`VectorMatrix`]
///
/// The index keeps the precomputed row norms; the rows themselves stay in the
/// matrix it was fitted on, which must be passed back in at search time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborIndex {
    metric: Metric,
    algorithm: Algorithm,
    norms: Vec<f64>,
}

impl NeighborIndex {
    pub fn fit(matrix: &VectorMatrix) -> Self {
        Self {
            metric: Metric::Cosine,
            algorithm: Algorithm::BruteForce,
            norms: matrix.rows().iter().map(SparseVector::norm).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.norms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The `k` rows nearest to `query`, ascending distance, ties by row index
    ///
    /// `k` larger than the matrix returns every row.
    pub fn search(
        &self,
        matrix: &VectorMatrix,
        query: &SparseVector,
        k: usize,
    ) -> EngineResult<Vec<Neighbor>> {
        if matrix.len() != self.norms.len() {
            return Err(EngineError::CorruptArtifact(format!(
                "neighbor index was fitted on {} rows but the matrix has {}",
                self.norms.len(),
                matrix.len()
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = query.norm();
        let mut neighbors: Vec<Neighbor> = matrix
            .rows()
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(row_index, (row, &norm))| Neighbor {
                row_index,
                distance: cosine_distance_with_norms(query, query_norm, row, norm),
            })
            .collect();

        let by_rank = |a: &Neighbor, b: &Neighbor| -> Ordering {
            a.distance
                .total_cmp(&b.distance)
                .then(a.row_index.cmp(&b.row_index))
        };

        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, by_rank);
            neighbors.truncate(k);
        }
        neighbors.sort_unstable_by(by_rank);

        Ok(neighbors)
    }
}
