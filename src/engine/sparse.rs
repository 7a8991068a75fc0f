use serde::{Deserialize, Serialize};

/// Sparse vector of `f64` weights keyed by term index
///
/// Entries are kept sorted by index with no duplicates and no explicit zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a vector from `(index, weight)` pairs in any order
    ///
    /// Weights for a repeated index are summed.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut entries: Vec<(usize, f64)> = pairs.into_iter().collect();
        entries.sort_by_key(|&(index, _)| index);

        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(entries.len());
        for (index, weight) in entries {
            match merged.last_mut() {
                Some((last, acc)) if *last == index => *acc += weight,
                _ => merged.push((index, weight)),
            }
        }
        merged.retain(|&(_, weight)| weight != 0.0);

        Self { entries: merged }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest stored index, if any
    pub fn max_index(&self) -> Option<usize> {
        self.entries.last().map(|&(index, _)| index)
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (a, b) = (&self.entries, &other.entries);
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a[i].1 * b[j].1;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    pub fn norm(&self) -> f64 {
        self.entries
            .iter()
            .map(|&(_, w)| w * w)
            .sum::<f64>()
            .sqrt()
    }

    pub fn scale(&mut self, factor: f64) {
        for (_, weight) in &mut self.entries {
            *weight *= factor;
        }
        self.entries.retain(|&(_, weight)| weight != 0.0);
    }

    /// Scales the vector to unit L2 norm; a zero vector stays zero
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            self.scale(1.0 / norm);
        }
    }

    /// Weighted sum of vectors, `sum(w_i * v_i)`
    pub fn weighted_sum<'a>(terms: impl IntoIterator<Item = (f64, &'a SparseVector)>) -> Self {
        Self::from_pairs(terms.into_iter().flat_map(|(factor, vector)| {
            vector
                .entries
                .iter()
                .map(move |&(index, weight)| (index, factor * weight))
        }))
    }

    /// Cosine distance in `[0, 2]`
    ///
    /// A zero vector has distance 1 to everything, matching the convention of
    /// normalizing zero rows to zero before taking the dot product.
    pub fn cosine_distance(&self, other: &SparseVector) -> f64 {
        cosine_distance_with_norms(self, self.norm(), other, other.norm())
    }
}

pub(crate) fn cosine_distance_with_norms(
    a: &SparseVector,
    norm_a: f64,
    b: &SparseVector,
    norm_b: f64,
) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    let similarity = a.dot(b) / (norm_a * norm_b);
    (1.0 - similarity).clamp(0.0, 2.0)
}
