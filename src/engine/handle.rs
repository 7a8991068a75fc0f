use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use super::catalog::Catalog;
use super::error::EngineResult;
use super::index::ArtifactBundle;
use super::query::{recommend_with, Recommendation, RecommendOptions};
use super::store::ArtifactStore;

/// A catalog paired with the artifact bundle built from it
#[derive(Debug)]
pub struct Engine {
    catalog: Catalog,
    bundle: ArtifactBundle,
}

impl Engine {
    /// Pairs `catalog` with `bundle`, rejecting a bundle built from other data
    pub fn new(catalog: Catalog, bundle: ArtifactBundle) -> EngineResult<Self> {
        bundle.check_consistency()?;
        bundle.check_catalog(&catalog)?;
        Ok(Self { catalog, bundle })
    }

    /// Loads the catalog CSV and the current bundle from `store`
    pub fn load(catalog_path: impl AsRef<Path>, store: &ArtifactStore) -> EngineResult<Self> {
        let catalog = Catalog::load_csv(catalog_path)?;
        let bundle = store.load()?;
        Self::new(catalog, bundle)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn recommend<S: AsRef<str>>(
        &self,
        reference_titles: &[S],
        top_n: usize,
        options: &RecommendOptions,
    ) -> EngineResult<Vec<Recommendation>> {
        recommend_with(&self.catalog, &self.bundle, reference_titles, top_n, options)
    }
}

/// The engine currently being served, if any
///
/// Readers clone the inner `Arc` and keep using that engine for the whole
/// request, so a concurrent [`swap`](EngineHandle::swap) is never observed
/// halfway.
#[derive(Debug, Default)]
pub struct EngineHandle {
    current: RwLock<Option<Arc<Engine>>>,
}

impl EngineHandle {
    pub fn new(engine: Engine) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(engine))),
        }
    }

    /// A handle with nothing to serve until the first swap
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<Engine>> {
        self.current.read().clone()
    }

    /// Replaces the served engine, returning the previous one
    pub fn swap(&self, engine: Engine) -> Option<Arc<Engine>> {
        let fit_id = engine.bundle().fit_id();
        let previous = self.current.write().replace(Arc::new(engine));
        tracing::info!(fit_id = %fit_id, "Swapped in artifact bundle");
        previous
    }

    /// Stops serving until the next successful swap
    pub fn take_offline(&self) -> Option<Arc<Engine>> {
        let previous = self.current.write().take();
        if let Some(engine) = &previous {
            tracing::error!(
                fit_id = %engine.bundle().fit_id(),
                "Artifact bundle taken offline"
            );
        }
        previous
    }

    pub fn is_online(&self) -> bool {
        self.current.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::EngineError;
    use crate::engine::index::{build_index, IndexConfig};

    fn catalog(rows: &[(&str, &str)]) -> Catalog {
        Catalog::from_rows(rows.iter().copied())
    }

    #[test]
    fn test_engine_rejects_bundle_from_other_catalog() {
        let built_from = catalog(&[("a", "space war"), ("b", "romance drama")]);
        let bundle = build_index(&built_from, &IndexConfig::default()).unwrap();
        let edited = catalog(&[("a", "space war"), ("b", "romance comedy")]);
        assert!(matches!(
            Engine::new(edited, bundle),
            Err(EngineError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_swap_replaces_catalog_and_bundle_together() {
        let first = catalog(&[("a", "space war"), ("b", "space war robot")]);
        let bundle = build_index(&first, &IndexConfig::default()).unwrap();
        let handle = EngineHandle::new(Engine::new(first, bundle).unwrap());

        let held = handle.get().unwrap();

        let second = catalog(&[("x", "romance"), ("y", "romance drama"), ("z", "war")]);
        let bundle = build_index(&second, &IndexConfig::default()).unwrap();
        handle.swap(Engine::new(second, bundle).unwrap());

        assert_eq!(held.catalog().len(), 2);
        assert_eq!(held.bundle().catalog_rows(), 2);
        let current = handle.get().unwrap();
        assert_eq!(current.catalog().len(), 3);
        assert_eq!(current.bundle().catalog_rows(), 3);
    }

    #[test]
    fn test_take_offline() {
        let handle = EngineHandle::offline();
        assert!(!handle.is_online());
        assert!(handle.take_offline().is_none());

        let c = catalog(&[("a", "space war")]);
        let bundle = build_index(&c, &IndexConfig::default()).unwrap();
        handle.swap(Engine::new(c, bundle).unwrap());
        assert!(handle.is_online());
        assert!(handle.take_offline().is_some());
        assert!(handle.get().is_none());
    }
}
