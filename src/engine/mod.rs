//! Content-based similarity engine
//!
//! The offline half ([`build_index`]) fits a TF-IDF vectorizer over catalog
//! tags and an exact cosine neighbor index over the resulting rows. The online
//! half ([`recommend`]) blends one or more reference titles into a query
//! vector and returns their nearest catalog rows.

pub mod catalog;
pub mod error;
pub mod handle;
pub mod index;
pub mod neighbors;
pub mod query;
pub mod sparse;
pub mod store;
pub mod text;
pub mod vectorizer;

pub use catalog::{Catalog, CatalogEntry};
pub use error::{EngineError, EngineResult};
pub use handle::{Engine, EngineHandle};
pub use index::{build_index, ArtifactBundle, IndexConfig};
pub use neighbors::{Neighbor, NeighborIndex, VectorMatrix};
pub use query::{recommend, recommend_with, Recommendation, RecommendOptions, Weighting};
pub use sparse::SparseVector;
pub use store::{ArtifactStore, BuildLock, Manifest};
pub use text::StopWords;
pub use vectorizer::{TfidfVectorizer, VectorizerConfig};
