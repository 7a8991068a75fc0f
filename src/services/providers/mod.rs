//! Movie metadata provider abstraction
//!
//! Recommendations come out of the engine as bare catalog titles. A provider
//! turns each title into display metadata (poster, overview, provider id).
//! Enrichment never fails a request: a title the provider cannot resolve is
//! returned as a bare card.
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    engine::Recommendation,
    error::AppResult,
    models::{MovieCard, TmdbMovie, TmdbMovieDetails},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Trait for movie metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search the provider's catalog by title
    async fn search_movies(&self, title: &str) -> AppResult<Vec<TmdbMovie>>;

    /// Full details for one provider id; `NotFound` when the id is unknown
    async fn movie_details(&self, id: u64) -> AppResult<TmdbMovieDetails>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Picks the result whose title equals `title` ignoring case, else the first
pub fn best_match<'a>(title: &str, results: &'a [TmdbMovie]) -> Option<&'a TmdbMovie> {
    let wanted = title.to_lowercase();
    results
        .iter()
        .find(|movie| {
            movie
                .title
                .as_deref()
                .is_some_and(|t| t.to_lowercase() == wanted)
        })
        .or_else(|| results.first())
}

/// Resolves every recommendation to a card, keeping the ranking order
///
/// Lookups run concurrently. Cards resolving to a provider id already shown
/// earlier in the list are dropped.
pub async fn enrich(
    provider: Arc<dyn MetadataProvider>,
    recommendations: &[Recommendation],
) -> Vec<MovieCard> {
    let mut tasks = Vec::with_capacity(recommendations.len());

    for recommendation in recommendations {
        let provider = provider.clone();
        let title = recommendation.title.clone();
        let task = tokio::spawn(async move { provider.search_movies(&title).await });
        tasks.push(task);
    }

    let mut cards = Vec::with_capacity(recommendations.len());
    let mut failures = 0usize;

    for (recommendation, task) in recommendations.iter().zip(tasks) {
        let card = match task.await {
            Ok(Ok(results)) => match best_match(&recommendation.title, &results) {
                Some(movie) => MovieCard::from_tmdb(recommendation, movie),
                None => MovieCard::bare(recommendation),
            },
            Ok(Err(e)) => {
                tracing::warn!(
                    error = %e,
                    title = %recommendation.title,
                    provider = provider.name(),
                    "Metadata lookup failed"
                );
                failures += 1;
                MovieCard::bare(recommendation)
            }
            Err(e) => {
                tracing::error!(error = %e, "Task join error");
                failures += 1;
                MovieCard::bare(recommendation)
            }
        };
        cards.push(card);
    }

    if failures > 0 {
        tracing::warn!(
            success_count = cards.len() - failures,
            error_count = failures,
            "Partial metadata fetch failure"
        );
    }

    dedup_by_provider_id(cards)
}

/// Drops untitled results and repeats of a title already listed
pub fn dedup_by_title(movies: Vec<TmdbMovie>) -> Vec<TmdbMovie> {
    let mut seen = HashSet::new();
    movies
        .into_iter()
        .filter(|movie| {
            movie
                .title
                .as_ref()
                .is_some_and(|title| seen.insert(title.clone()))
        })
        .collect()
}

fn dedup_by_provider_id(cards: Vec<MovieCard>) -> Vec<MovieCard> {
    let mut seen = HashSet::new();
    cards
        .into_iter()
        .filter(|card| card.id.map_or(true, |id| seen.insert(id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn movie(id: u64, title: &str) -> TmdbMovie {
        TmdbMovie {
            id,
            title: Some(title.to_string()),
            poster_path: Some(format!("/{}.jpg", id)),
            overview: Some(format!("About {}", title)),
            release_date: None,
        }
    }

    fn rec(row_index: usize, title: &str) -> Recommendation {
        Recommendation {
            row_index,
            title: title.to_string(),
            distance: 0.1 * row_index as f64,
        }
    }

    #[test]
    fn test_best_match_prefers_exact_title() {
        let results = vec![movie(1, "Heat Wave"), movie(2, "HEAT")];
        assert_eq!(best_match("heat", &results).unwrap().id, 2);
        assert_eq!(best_match("ronin", &results).unwrap().id, 1);
        assert!(best_match("heat", &[]).is_none());
    }

    #[tokio::test]
    async fn test_enrich_keeps_order_and_falls_back() {
        let mut provider = MockMetadataProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_search_movies()
            .returning(|title| match title {
                "Alien" => Ok(vec![movie(348, "Alien")]),
                "Aliens" => Err(AppError::ExternalApi("timeout".to_string())),
                _ => Ok(vec![]),
            });

        let recs = vec![rec(0, "Alien"), rec(1, "Aliens"), rec(2, "Obscure")];
        let cards = enrich(Arc::new(provider), &recs).await;

        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].id, Some(348));
        assert_eq!(cards[0].poster_path.as_deref(), Some("/348.jpg"));
        assert_eq!(cards[1].id, None);
        assert_eq!(cards[1].title, "Aliens");
        assert_eq!(cards[2].title, "Obscure");
    }

    #[tokio::test]
    async fn test_enrich_dedups_by_provider_id() {
        let mut provider = MockMetadataProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_search_movies()
            .returning(|_| Ok(vec![movie(7, "Same Movie")]));

        let recs = vec![rec(0, "Same Movie"), rec(1, "Same Movie (Redux)")];
        let cards = enrich(Arc::new(provider), &recs).await;
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, Some(7));
    }

    #[test]
    fn test_dedup_by_title_keeps_first_of_each_title() {
        let mut untitled = movie(3, "");
        untitled.title = None;
        let movies = vec![movie(1, "Heat"), movie(2, "Heat"), untitled, movie(4, "Ronin")];

        let ids: Vec<u64> = dedup_by_title(movies).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 4]);
    }
}
