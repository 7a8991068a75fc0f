pub mod history;
pub mod providers;
pub mod recommendations;

pub use history::SearchHistory;
pub use providers::{MetadataProvider, TmdbProvider};
pub use recommendations::{RecommendationService, RecommendationSettings};
