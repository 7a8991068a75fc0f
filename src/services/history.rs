use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::models::{PopularSearch, SearchRecord};

/// Upper bound on records kept per user; older searches are dropped first
const MAX_RECORDS_PER_USER: usize = 500;

/// In-memory per-user search history
#[derive(Debug, Default)]
pub struct SearchHistory {
    searches: RwLock<HashMap<String, Vec<SearchRecord>>>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a search made now
    pub fn record(&self, user_id: &str, movie_title: &str) -> SearchRecord {
        self.record_at(user_id, movie_title, Utc::now())
    }

    pub fn record_at(
        &self,
        user_id: &str,
        movie_title: &str,
        searched_at: DateTime<Utc>,
    ) -> SearchRecord {
        let record = SearchRecord {
            movie_title: movie_title.to_string(),
            searched_at,
        };

        let mut searches = self.searches.write();
        let records = searches.entry(user_id.to_string()).or_default();
        records.push(record.clone());
        // Keep chronological order even for out-of-order timestamps.
        records.sort_by_key(|r| r.searched_at);
        if records.len() > MAX_RECORDS_PER_USER {
            let excess = records.len() - MAX_RECORDS_PER_USER;
            records.drain(..excess);
        }

        tracing::debug!(user_id = %user_id, movie_title = %movie_title, "Recorded search");
        record
    }

    /// Titles of the user's `window` most recent searches, most recent first
    pub fn recent_titles(&self, user_id: &str, window: usize) -> Vec<String> {
        self.searches
            .read()
            .get(user_id)
            .map(|records| {
                records
                    .iter()
                    .rev()
                    .take(window)
                    .map(|r| r.movie_title.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All of a user's searches, most recent first
    pub fn searches(&self, user_id: &str) -> Vec<SearchRecord> {
        self.searches
            .read()
            .get(user_id)
            .map(|records| records.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Most searched titles across all users, by count then title
    pub fn most_searched(&self, limit: usize) -> Vec<PopularSearch> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for records in self.searches.read().values() {
            for record in records {
                *counts.entry(record.movie_title.clone()).or_default() += 1;
            }
        }

        let mut popular: Vec<PopularSearch> = counts
            .into_iter()
            .map(|(movie_title, count)| PopularSearch { movie_title, count })
            .collect();
        popular.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.movie_title.cmp(&b.movie_title))
        });
        popular.truncate(limit);
        popular
    }
}
