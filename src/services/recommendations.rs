use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::Config,
    engine::{ArtifactStore, Engine, EngineError, EngineHandle, Recommendation, RecommendOptions},
    error::{AppError, AppResult},
    models::{validate_query, MovieCard, PopularSearch, SearchRecord, TmdbMovie, TmdbMovieDetails},
    services::{history::SearchHistory, providers, providers::MetadataProvider},
};

/// Tunables for the search and history recommendation paths
#[derive(Debug, Clone)]
pub struct RecommendationSettings {
    pub search_top_n: usize,
    pub history_top_n: usize,
    pub history_window: usize,
    pub search_options: RecommendOptions,
    pub history_options: RecommendOptions,
}

impl From<&Config> for RecommendationSettings {
    fn from(config: &Config) -> Self {
        Self {
            search_top_n: config.search_top_n,
            history_top_n: config.history_top_n,
            history_window: config.history_window,
            search_options: config.search_options(),
            history_options: config.history_options(),
        }
    }
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Result of recording a search
#[derive(Debug, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    /// Provider matches for the query itself, one per title
    pub movies: Vec<TmdbMovie>,
    pub recommendations: Vec<MovieCard>,
}

/// Where a reload reads its catalog and artifacts from
#[derive(Debug, Clone)]
pub struct ReloadSource {
    pub catalog_path: PathBuf,
    pub store: ArtifactStore,
}

/// Serves recommendations for single searches and for search history
pub struct RecommendationService {
    engine: Arc<EngineHandle>,
    history: Arc<SearchHistory>,
    metadata: Option<Arc<dyn MetadataProvider>>,
    settings: RecommendationSettings,
    reload_source: Option<ReloadSource>,
    reload_guard: Mutex<()>,
}

impl RecommendationService {
    pub fn new(
        engine: Arc<EngineHandle>,
        history: Arc<SearchHistory>,
        settings: RecommendationSettings,
    ) -> Self {
        Self {
            engine,
            history,
            metadata: None,
            settings,
            reload_source: None,
            reload_guard: Mutex::new(()),
        }
    }

    pub fn with_metadata(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(provider);
        self
    }

    pub fn with_reload_source(mut self, source: ReloadSource) -> Self {
        self.reload_source = Some(source);
        self
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn settings(&self) -> &RecommendationSettings {
        &self.settings
    }

    /// Ranked catalog rows for `titles`
    ///
    /// A corrupt bundle takes the engine offline: no further recommendation
    /// is served until a reload succeeds.
    pub fn recommend_titles<S: AsRef<str>>(
        &self,
        titles: &[S],
        top_n: usize,
        options: &RecommendOptions,
    ) -> AppResult<Vec<Recommendation>> {
        let engine = self.engine.get().ok_or_else(|| {
            AppError::EngineUnavailable("no artifact bundle is loaded".to_string())
        })?;

        match engine.recommend(titles, top_n, options) {
            Ok(recommendations) => Ok(recommendations),
            Err(EngineError::CorruptArtifact(reason)) => {
                tracing::error!(
                    fit_id = %engine.bundle().fit_id(),
                    reason = %reason,
                    "Corrupt artifact bundle detected while serving"
                );
                self.engine.take_offline();
                Err(AppError::EngineUnavailable(reason))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Recommendations for one title
    pub async fn recommend_for_query(
        &self,
        title: &str,
        top_n: Option<usize>,
    ) -> AppResult<Vec<MovieCard>> {
        let top_n = top_n.unwrap_or(self.settings.search_top_n);
        let recommendations =
            self.recommend_titles(&[title], top_n, &self.settings.search_options)?;
        Ok(self.to_cards(&recommendations).await)
    }

    /// Validates and records a search, then recommends from it
    ///
    /// Provider matches for the query are best effort: a provider failure
    /// leaves `movies` empty and still serves the recommendations.
    pub async fn search(&self, user_id: &str, query: &str) -> AppResult<SearchOutcome> {
        let query = validate_query(query)?;
        let movies = self.search_movies(&query).await;
        self.history.record(user_id, &query);
        let recommendations = self.recommend_for_query(&query, None).await?;

        tracing::info!(
            user_id = %user_id,
            query = %query,
            movies = movies.len(),
            recommendations = recommendations.len(),
            "Search recorded"
        );

        Ok(SearchOutcome {
            query,
            movies,
            recommendations,
        })
    }

    async fn search_movies(&self, query: &str) -> Vec<TmdbMovie> {
        let Some(provider) = &self.metadata else {
            return Vec::new();
        };
        match provider.search_movies(query).await {
            Ok(movies) => providers::dedup_by_title(movies),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    query = %query,
                    provider = provider.name(),
                    "Movie search failed"
                );
                Vec::new()
            }
        }
    }

    /// Provider details for one movie
    pub async fn movie_details(&self, id: u64) -> AppResult<TmdbMovieDetails> {
        let provider = self.metadata.as_ref().ok_or_else(|| {
            AppError::NotFound("movie metadata is not configured".to_string())
        })?;
        provider.movie_details(id).await
    }

    /// Recommendations blended from the user's most recent searches
    pub async fn recommend_for_history(
        &self,
        user_id: &str,
        top_n: Option<usize>,
    ) -> AppResult<Vec<MovieCard>> {
        let titles = self
            .history
            .recent_titles(user_id, self.settings.history_window);
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let top_n = top_n.unwrap_or(self.settings.history_top_n);
        let recommendations =
            self.recommend_titles(&titles, top_n, &self.settings.history_options)?;

        tracing::info!(
            user_id = %user_id,
            history = titles.len(),
            recommendations = recommendations.len(),
            "History recommendations computed"
        );

        Ok(self.to_cards(&recommendations).await)
    }

    pub fn searches(&self, user_id: &str) -> Vec<SearchRecord> {
        self.history.searches(user_id)
    }

    pub fn popular_searches(&self, limit: usize) -> Vec<PopularSearch> {
        self.history.most_searched(limit)
    }

    /// Reloads catalog and artifacts from disk and swaps them in
    ///
    /// On failure the engine being served, if any, is left in place.
    pub async fn reload(&self) -> AppResult<Uuid> {
        let source = self
            .reload_source
            .clone()
            .ok_or_else(|| AppError::Internal("no reload source configured".to_string()))?;
        let _guard = self.reload_guard.lock().await;

        let engine = tokio::task::spawn_blocking(move || {
            Engine::load(&source.catalog_path, &source.store)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| {
            tracing::error!(error = %e, "Reload failed, keeping current bundle");
            AppError::from(e)
        })?;

        let fit_id = engine.bundle().fit_id();
        self.engine.swap(engine);
        Ok(fit_id)
    }

    async fn to_cards(&self, recommendations: &[Recommendation]) -> Vec<MovieCard> {
        match &self.metadata {
            Some(provider) => providers::enrich(provider.clone(), recommendations).await,
            None => recommendations.iter().map(MovieCard::bare).collect(),
        }
    }
}
