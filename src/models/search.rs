use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// One search made by a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRecord {
    pub movie_title: String,
    pub searched_at: DateTime<Utc>,
}

/// A title and how many times it was searched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PopularSearch {
    pub movie_title: String,
    pub count: usize,
}

const MIN_QUERY_CHARS: usize = 2;
const MAX_QUERY_CHARS: usize = 255;
const ALLOWED_PUNCTUATION: &str = ":,'&.-()[]!";

/// Trims `query` and checks it looks like a movie title
pub fn validate_query(query: &str) -> AppResult<String> {
    let query = query.trim();
    let chars = query.chars().count();

    if chars < MIN_QUERY_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Search query must be at least {} characters",
            MIN_QUERY_CHARS
        )));
    }
    if chars > MAX_QUERY_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Search query must be at most {} characters",
            MAX_QUERY_CHARS
        )));
    }
    if let Some(bad) = query.chars().find(|&c| {
        !(c.is_ascii_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(c))
    }) {
        return Err(AppError::InvalidInput(format!(
            "Search query contains unsupported character '{}'",
            bad
        )));
    }

    Ok(query.to_string())
}
