use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::{IndexConfig, RecommendOptions, StopWords, VectorizerConfig, Weighting};

/// How history searches are weighted when blended
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryWeighting {
    Uniform,
    Recency,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Movie catalog CSV with `title` and `tags` columns
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Directory holding persisted artifact bundles
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Stop word policy used when building the index
    #[serde(default)]
    pub stop_words: StopWords,

    /// Number of most recent searches blended into history recommendations
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default = "default_history_weighting")]
    pub history_weighting: HistoryWeighting,

    /// Decay factor for `recency` history weighting
    #[serde(default = "default_recency_decay")]
    pub recency_decay: f64,

    /// Average near-duplicate titles once instead of once per spelling
    #[serde(default)]
    pub collapse_near_duplicates: bool,

    /// Recommendations returned for a single search
    #[serde(default = "default_search_top_n")]
    pub search_top_n: usize,

    /// Recommendations returned from search history
    #[serde(default = "default_history_top_n")]
    pub history_top_n: usize,

    /// TMDB API key; metadata enrichment is disabled without one
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// TMDB request timeout in seconds
    #[serde(default = "default_tmdb_timeout_secs")]
    pub tmdb_timeout_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/final_movie_data.csv")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_history_window() -> usize {
    15
}

fn default_history_weighting() -> HistoryWeighting {
    HistoryWeighting::Uniform
}

fn default_recency_decay() -> f64 {
    0.8
}

fn default_search_top_n() -> usize {
    8
}

fn default_history_top_n() -> usize {
    32
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_timeout_secs() -> u64 {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            artifact_dir: default_artifact_dir(),
            stop_words: StopWords::default(),
            history_window: default_history_window(),
            history_weighting: default_history_weighting(),
            recency_decay: default_recency_decay(),
            collapse_near_duplicates: false,
            search_top_n: default_search_top_n(),
            history_top_n: default_history_top_n(),
            tmdb_api_key: None,
            tmdb_api_url: default_tmdb_api_url(),
            tmdb_timeout_secs: default_tmdb_timeout_secs(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.history_window == 0 {
            anyhow::bail!("HISTORY_WINDOW must be at least 1");
        }
        if !(self.recency_decay > 0.0 && self.recency_decay <= 1.0) {
            anyhow::bail!("RECENCY_DECAY must be in (0, 1], got {}", self.recency_decay);
        }
        Ok(())
    }

    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            vectorizer: VectorizerConfig {
                stop_words: self.stop_words,
                ..VectorizerConfig::default()
            },
        }
    }

    /// Policy for single-search recommendations
    pub fn search_options(&self) -> RecommendOptions {
        RecommendOptions {
            weighting: Weighting::Uniform,
            collapse_near_duplicates: self.collapse_near_duplicates,
        }
    }

    /// Policy for history recommendations
    pub fn history_options(&self) -> RecommendOptions {
        let weighting = match self.history_weighting {
            HistoryWeighting::Uniform => Weighting::Uniform,
            HistoryWeighting::Recency => Weighting::RecencyDecay {
                factor: self.recency_decay,
            },
        };
        RecommendOptions {
            weighting,
            collapse_near_duplicates: self.collapse_near_duplicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_env() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.history_window, 15);
        assert_eq!(config.search_top_n, 8);
        assert_eq!(config.history_top_n, 32);
        assert_eq!(config.stop_words, StopWords::English);
        assert_eq!(config.history_weighting, HistoryWeighting::Uniform);
        assert!(config.tmdb_api_key.is_none());
        assert_eq!(config.history_options().weighting, Weighting::Uniform);
    }

    #[test]
    fn test_env_overrides() {
        let config: Config = envy::from_iter(vec![
            ("STOP_WORDS".to_string(), "none".to_string()),
            ("HISTORY_WEIGHTING".to_string(), "recency".to_string()),
            ("RECENCY_DECAY".to_string(), "0.5".to_string()),
            ("COLLAPSE_NEAR_DUPLICATES".to_string(), "true".to_string()),
        ])
        .unwrap();

        assert_eq!(config.index_config().vectorizer.stop_words, StopWords::None);
        assert_eq!(
            config.history_options().weighting,
            Weighting::RecencyDecay { factor: 0.5 }
        );
        assert!(config.search_options().collapse_near_duplicates);
        assert_eq!(config.search_options().weighting, Weighting::Uniform);
    }

    #[test]
    fn test_validate_rejects_bad_decay() {
        let config = Config {
            recency_decay: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
