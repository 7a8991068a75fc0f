//! TMDB metadata provider
//!
//! Uses the `search/movie` and `movie/{id}` endpoints with the v3 `api_key`
//! query parameter.
use std::time::Duration;

use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{TmdbMovie, TmdbMovieDetails},
    services::providers::MetadataProvider,
};

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search/movie", self.api_url)
    }

    fn details_url(&self, id: u64) -> String {
        format!("{}/movie/{}", self.api_url, id)
    }
}

async fn api_error(response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    AppError::ExternalApi(format!("TMDB API returned status {}: {}", status, body))
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn search_movies(&self, title: &str) -> AppResult<Vec<TmdbMovie>> {
        if title.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let response = self
            .http_client
            .get(self.search_url())
            .query(&[("api_key", self.api_key.as_str()), ("query", title)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let search: SearchResponse = response.json().await?;

        tracing::debug!(
            query = %title,
            results = search.results.len(),
            provider = "tmdb",
            "Movie search completed"
        );

        Ok(search.results)
    }

    async fn movie_details(&self, id: u64) -> AppResult<TmdbMovieDetails> {
        let response = self
            .http_client
            .get(self.details_url(id))
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(AppError::NotFound(format!("Movie {} not found", id)));
            }
            status if !status.is_success() => return Err(api_error(response).await),
            _ => {}
        }

        let details: TmdbMovieDetails = response.json().await?;
        tracing::debug!(id, provider = "tmdb", "Movie details fetched");
        Ok(details)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_strips_trailing_slash() {
        let provider = TmdbProvider::new(
            "key".to_string(),
            "https://api.themoviedb.org/3/".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            provider.search_url(),
            "https://api.themoviedb.org/3/search/movie"
        );
        assert_eq!(
            provider.details_url(603),
            "https://api.themoviedb.org/3/movie/603"
        );
    }

    #[test]
    fn test_search_response_deserialization() {
        let json = r#"{
            "page": 1,
            "results": [
                {"id": 603, "title": "The Matrix", "poster_path": "/m.jpg", "overview": "Neo"},
                {"id": 604, "title": "The Matrix Reloaded"}
            ],
            "total_results": 2
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].id, 603);
        assert!(response.results[1].overview.is_none());
    }

    #[tokio::test]
    async fn test_empty_title_is_rejected_without_request() {
        let provider = TmdbProvider::new(
            "key".to_string(),
            "http://test.local".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(matches!(
            provider.search_movies("  ").await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
