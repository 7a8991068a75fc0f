use std::sync::Arc;
use std::time::Duration;

use reelmatch::{
    config::Config,
    engine::{ArtifactStore, Engine, EngineHandle},
    routes::{create_router, AppState},
    services::{
        recommendations::ReloadSource, RecommendationService, RecommendationSettings,
        SearchHistory, TmdbProvider,
    },
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = Config::from_env()?;
    let store = ArtifactStore::new(&config.artifact_dir);

    // A missing or inconsistent bundle is fatal at startup: there is nothing
    // safe to serve until the indexer has run.
    let engine = Engine::load(&config.catalog_path, &store).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load catalog {} with artifacts in {}: {} (run reelmatch-index first)",
            config.catalog_path.display(),
            config.artifact_dir.display(),
            e
        )
    })?;

    tracing::info!(
        fit_id = %engine.bundle().fit_id(),
        rows = engine.catalog().len(),
        built_at = %engine.bundle().built_at(),
        "Similarity engine ready"
    );

    let mut service = RecommendationService::new(
        Arc::new(EngineHandle::new(engine)),
        Arc::new(SearchHistory::new()),
        RecommendationSettings::from(&config),
    )
    .with_reload_source(ReloadSource {
        catalog_path: config.catalog_path.clone(),
        store,
    });

    match &config.tmdb_api_key {
        Some(api_key) => {
            let provider = TmdbProvider::new(
                api_key.clone(),
                config.tmdb_api_url.clone(),
                Duration::from_secs(config.tmdb_timeout_secs),
            )?;
            service = service.with_metadata(Arc::new(provider));
            tracing::info!(api_url = %config.tmdb_api_url, "TMDB metadata enrichment enabled");
        }
        None => tracing::warn!("TMDB_API_KEY not set, recommendations will carry titles only"),
    }

    let app = create_router(AppState::new(service));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
