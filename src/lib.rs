use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Chunk not found: {0}")]
    NotFound(String),

    #[error("Duplicate chunk id: {0}")]
    DuplicateId(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Chunk store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl IndexError {
    /// Whether the caller may retry the same request unchanged.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Embedding(_))
    }
}

impl From<sqlx::Error> for IndexError {
    #[inline]
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod index;
pub mod indexer;
pub mod vector;
