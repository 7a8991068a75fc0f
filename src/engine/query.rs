use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::catalog::{lookup_key, normalized_title, Catalog, CatalogEntry};
use super::error::{EngineError, EngineResult};
use super::index::ArtifactBundle;
use super::sparse::SparseVector;

/// How reference vectors are combined into one query vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Weighting {
    /// Unweighted elementwise mean
    #[default]
    Uniform,
    /// The i-th reference title (most recent first) weighs `factor^i`,
    /// normalized so the weights sum to one
    RecencyDecay { factor: f64 },
}

impl Weighting {
    fn weights(self, count: usize) -> Vec<f64> {
        match self {
            Weighting::Uniform => vec![1.0 / count as f64; count],
            Weighting::RecencyDecay { factor } => {
                let raw: Vec<f64> = (0..count).map(|i| factor.powi(i as i32)).collect();
                let total: f64 = raw.iter().sum();
                if total > 0.0 && total.is_finite() {
                    raw.into_iter().map(|w| w / total).collect()
                } else {
                    vec![1.0 / count as f64; count]
                }
            }
        }
    }
}

/// Policy flags for [`recommend_with`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecommendOptions {
    pub weighting: Weighting,
    /// Average titles that differ only in case or punctuation once
    pub collapse_near_duplicates: bool,
}

/// A recommended catalog row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub row_index: usize,
    pub title: String,
    pub distance: f64,
}

/// Top `top_n` catalog rows most similar to `reference_titles`, unweighted mean
pub fn recommend<S: AsRef<str>>(
    catalog: &Catalog,
    bundle: &ArtifactBundle,
    reference_titles: &[S],
    top_n: usize,
) -> EngineResult<Vec<Recommendation>> {
    recommend_with(
        catalog,
        bundle,
        reference_titles,
        top_n,
        &RecommendOptions::default(),
    )
}

/// Top `top_n` catalog rows most similar to `reference_titles`
///
/// Titles are matched case-insensitively against the catalog (first row wins)
/// and unmatched titles are dropped. Rows whose title appears among the
/// reference titles are never returned. Results are ordered by ascending
/// cosine distance, ties by row index.
pub fn recommend_with<S: AsRef<str>>(
    catalog: &Catalog,
    bundle: &ArtifactBundle,
    reference_titles: &[S],
    top_n: usize,
    options: &RecommendOptions,
) -> EngineResult<Vec<Recommendation>> {
    if top_n == 0 || reference_titles.is_empty() {
        return Ok(Vec::new());
    }

    if catalog.len() != bundle.matrix().len() {
        return Err(EngineError::CorruptArtifact(format!(
            "catalog has {} rows but the vector matrix has {}",
            catalog.len(),
            bundle.matrix().len()
        )));
    }

    let matched = match_references(catalog, reference_titles, options.collapse_near_duplicates);
    if matched.is_empty() {
        tracing::debug!(
            references = reference_titles.len(),
            "No reference title matched the catalog"
        );
        return Ok(Vec::new());
    }

    let vectors: Vec<SparseVector> = matched
        .iter()
        .map(|entry| bundle.vectorizer().transform(&entry.tags))
        .collect();
    let weights = options.weighting.weights(vectors.len());
    let query = SparseVector::weighted_sum(weights.into_iter().zip(&vectors));
    if query.is_zero() {
        tracing::debug!(
            matched = matched.len(),
            "Reference tags are all out of vocabulary, ranking falls back to row order"
        );
    }

    let excluded: HashSet<String> = reference_titles
        .iter()
        .map(|title| lookup_key(title.as_ref()))
        .collect();

    // Every row sharing a reference title is dropped below, duplicates and
    // collapsed spellings included, so over-fetch by exactly that many rows.
    let excluded_rows = catalog
        .entries()
        .iter()
        .filter(|entry| excluded.contains(&lookup_key(&entry.title)))
        .count();

    let neighbors = bundle
        .index()
        .search(bundle.matrix(), &query, top_n.saturating_add(excluded_rows))?;

    let recommendations: Vec<Recommendation> = neighbors
        .into_iter()
        .filter_map(|neighbor| {
            let entry = catalog.get(neighbor.row_index)?;
            (!excluded.contains(&lookup_key(&entry.title))).then(|| Recommendation {
                row_index: entry.row_index,
                title: entry.title.clone(),
                distance: neighbor.distance,
            })
        })
        .take(top_n)
        .collect();

    tracing::debug!(
        references = reference_titles.len(),
        matched = matched.len(),
        returned = recommendations.len(),
        "Computed recommendations"
    );

    Ok(recommendations)
}

/// Catalog rows for the reference titles, in reference order
fn match_references<'c, S: AsRef<str>>(
    catalog: &'c Catalog,
    reference_titles: &[S],
    collapse_near_duplicates: bool,
) -> Vec<&'c CatalogEntry> {
    let mut seen = HashSet::new();
    reference_titles
        .iter()
        .filter_map(|title| catalog.find(title.as_ref()))
        .filter(|entry| !collapse_near_duplicates || seen.insert(normalized_title(&entry.title)))
        .collect()
}
