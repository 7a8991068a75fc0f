use reelmatch::{
    config::Config,
    engine::{build_index, ArtifactStore, Catalog},
    telemetry,
};

/// Builds the similarity index from the configured catalog and persists it
fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = Config::from_env()?;
    let store = ArtifactStore::new(&config.artifact_dir);

    // Held for the whole build so two indexers never interleave their saves.
    let lock = store.lock()?;

    let catalog = Catalog::load_csv(&config.catalog_path)?;
    let bundle = build_index(&catalog, &config.index_config())?;
    store.save(&bundle, &lock)?;

    tracing::info!(
        fit_id = %bundle.fit_id(),
        rows = bundle.catalog_rows(),
        artifact_dir = %store.root().display(),
        "Index build complete"
    );
    Ok(())
}
