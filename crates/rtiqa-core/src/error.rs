use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Embedding model mismatch: index built with '{found}', current model is '{expected}'")]
    ModelMismatch { expected: String, found: String },

    #[error("Vector dimension mismatch: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("Chunk file error: {0}")]
    ChunkFile(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
