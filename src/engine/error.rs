use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building, persisting or querying the similarity index
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Catalog is empty: nothing to index")]
    EmptyCatalog,

    #[error("Catalog tags produced an empty vocabulary")]
    EmptyVocabulary,

    #[error("Corrupt artifact bundle: {0}")]
    CorruptArtifact(String),

    #[error("Another index build holds the lock at {0}")]
    BuildInProgress(PathBuf),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Catalog read error: {0}")]
    Catalog(#[from] csv::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
