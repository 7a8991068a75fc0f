pub mod movie;
pub mod search;

pub use movie::{MovieCard, TmdbGenre, TmdbMovie, TmdbMovieDetails, OVERVIEW_PREVIEW_CHARS};
pub use search::{validate_query, PopularSearch, SearchRecord};
