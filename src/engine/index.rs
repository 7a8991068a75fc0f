use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::Catalog;
use super::error::{EngineError, EngineResult};
use super::neighbors::{NeighborIndex, VectorMatrix};
use super::vectorizer::{TfidfVectorizer, VectorizerConfig};

/// Settings for one index build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub vectorizer: VectorizerConfig,
}

/// Vectorizer, matrix and neighbor index produced by a single fit
///
/// The three parts are only ever constructed together by [`build_index`] or
/// loaded together by the artifact store, and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub(crate) fit_id: Uuid,
    pub(crate) built_at: DateTime<Utc>,
    pub(crate) catalog_rows: usize,
    pub(crate) catalog_fingerprint: u32,
    pub(crate) config: IndexConfig,
    pub(crate) vectorizer: TfidfVectorizer,
    pub(crate) matrix: VectorMatrix,
    pub(crate) index: NeighborIndex,
}

impl ArtifactBundle {
    pub fn fit_id(&self) -> Uuid {
        self.fit_id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn catalog_rows(&self) -> usize {
        self.catalog_rows
    }

    pub fn catalog_fingerprint(&self) -> u32 {
        self.catalog_fingerprint
    }

    pub fn config(&self) -> IndexConfig {
        self.config
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn matrix(&self) -> &VectorMatrix {
        &self.matrix
    }

    pub fn index(&self) -> &NeighborIndex {
        &self.index
    }

    /// Checks that the bundle's parts agree with each other
    pub fn check_consistency(&self) -> EngineResult<()> {
        self.vectorizer.check_consistency()?;

        if self.matrix.len() != self.catalog_rows || self.index.len() != self.catalog_rows {
            return Err(EngineError::CorruptArtifact(format!(
                "bundle {} records {} catalog rows but has {} matrix rows and {} index rows",
                self.fit_id,
                self.catalog_rows,
                self.matrix.len(),
                self.index.len()
            )));
        }

        let vocabulary = self.vectorizer.vocabulary_size();
        if let Some((row, _)) = self
            .matrix
            .rows()
            .iter()
            .enumerate()
            .find(|(_, row)| row.max_index().is_some_and(|i| i >= vocabulary))
        {
            return Err(EngineError::CorruptArtifact(format!(
                "matrix row {} references a term outside the {}-term vocabulary",
                row, vocabulary
            )));
        }

        Ok(())
    }

    /// Checks that the bundle was built from exactly this catalog
    pub fn check_catalog(&self, catalog: &Catalog) -> EngineResult<()> {
        if catalog.len() != self.catalog_rows {
            return Err(EngineError::CorruptArtifact(format!(
                "catalog has {} rows but bundle {} was built from {}",
                catalog.len(),
                self.fit_id,
                self.catalog_rows
            )));
        }
        if catalog.fingerprint() != self.catalog_fingerprint {
            return Err(EngineError::CorruptArtifact(format!(
                "catalog fingerprint {:08x} does not match bundle {} ({:08x})",
                catalog.fingerprint(),
                self.fit_id,
                self.catalog_fingerprint
            )));
        }
        Ok(())
    }
}

/// Fits the vectorizer, vector matrix and neighbor index over `catalog`
pub fn build_index(catalog: &Catalog, config: &IndexConfig) -> EngineResult<ArtifactBundle> {
    if catalog.is_empty() {
        return Err(EngineError::EmptyCatalog);
    }

    let started = std::time::Instant::now();
    let vectorizer = TfidfVectorizer::fit(
        catalog.entries().iter().map(|entry| entry.tags.as_str()),
        config.vectorizer,
    )?;

    let matrix = VectorMatrix::from_rows(
        catalog
            .entries()
            .iter()
            .map(|entry| vectorizer.transform(&entry.tags))
            .collect(),
    );
    let index = NeighborIndex::fit(&matrix);

    let bundle = ArtifactBundle {
        fit_id: Uuid::new_v4(),
        built_at: Utc::now(),
        catalog_rows: catalog.len(),
        catalog_fingerprint: catalog.fingerprint(),
        config: *config,
        vectorizer,
        matrix,
        index,
    };

    tracing::info!(
        fit_id = %bundle.fit_id,
        rows = bundle.catalog_rows,
        vocabulary = bundle.vectorizer.vocabulary_size(),
        stop_words = ?config.vectorizer.stop_words,
        metric = ?bundle.index.metric(),
        algorithm = ?bundle.index.algorithm(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Built similarity index"
    );

    Ok(bundle)
}
