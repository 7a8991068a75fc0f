use serde::{Deserialize, Serialize};

use crate::engine::Recommendation;

/// Characters of the overview kept on a recommendation card
pub const OVERVIEW_PREVIEW_CHARS: usize = 100;

/// A recommended movie as returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieCard {
    /// TMDB id, absent when no metadata was found
    pub id: Option<u64>,
    pub title: String,
    pub poster_path: Option<String>,
    pub overview: String,
    /// Cosine distance to the query
    pub distance: f64,
}

impl MovieCard {
    /// Card carrying only the catalog title
    pub fn bare(recommendation: &Recommendation) -> Self {
        Self {
            id: None,
            title: recommendation.title.clone(),
            poster_path: None,
            overview: String::new(),
            distance: recommendation.distance,
        }
    }

    /// Card filled from a TMDB search result
    pub fn from_tmdb(recommendation: &Recommendation, movie: &TmdbMovie) -> Self {
        Self {
            id: Some(movie.id),
            title: movie
                .title
                .clone()
                .unwrap_or_else(|| recommendation.title.clone()),
            poster_path: movie.poster_path.clone(),
            overview: movie
                .overview
                .as_deref()
                .unwrap_or_default()
                .chars()
                .take(OVERVIEW_PREVIEW_CHARS)
                .collect(),
            distance: recommendation.distance,
        }
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// One entry of a TMDB `search/movie` response
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TmdbMovie {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

/// A TMDB genre tag
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TmdbGenre {
    pub id: u64,
    pub name: String,
}

/// TMDB `movie/{id}` response, trimmed to the fields a detail page shows
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TmdbMovieDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    /// Minutes
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recommendation() -> Recommendation {
        Recommendation {
            row_index: 4,
            title: "Avatar".to_string(),
            distance: 0.25,
        }
    }

    #[test]
    fn test_bare_card() {
        let card = MovieCard::bare(&recommendation());
        assert_eq!(card.id, None);
        assert_eq!(card.title, "Avatar");
        assert!(card.poster_path.is_none());
        assert!(card.overview.is_empty());
    }

    #[test]
    fn test_tmdb_card_truncates_overview() {
        let movie = TmdbMovie {
            id: 19995,
            title: Some("Avatar".to_string()),
            poster_path: Some("/poster.jpg".to_string()),
            overview: Some("x".repeat(250)),
            release_date: None,
        };
        let card = MovieCard::from_tmdb(&recommendation(), &movie);
        assert_eq!(card.id, Some(19995));
        assert_eq!(card.overview.chars().count(), OVERVIEW_PREVIEW_CHARS);
        assert_eq!(card.distance, 0.25);
    }

    #[test]
    fn test_tmdb_movie_deserialization() {
        let json = r#"{
            "id": 19995,
            "title": "Avatar",
            "poster_path": null,
            "overview": "In the 22nd century...",
            "vote_average": 7.5
        }"#;

        let movie: TmdbMovie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.id, 19995);
        assert_eq!(movie.title.as_deref(), Some("Avatar"));
        assert!(movie.poster_path.is_none());
        assert!(movie.release_date.is_none());
    }

    #[test]
    fn test_movie_details_deserialization() {
        let json = r#"{
            "id": 603,
            "title": "The Matrix",
            "runtime": 136,
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "vote_average": 8.2,
            "budget": 63000000
        }"#;

        let details: TmdbMovieDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.runtime, Some(136));
        assert_eq!(details.genres[1].name, "Science Fiction");
        assert!(details.tagline.is_none());
    }
}
