//! Error types for the search engine

use thiserror::Error;

/// Result type alias for search engine operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error types that can occur while building, loading, or querying an index
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Degenerate vector: {0}")]
    DegenerateVector(String),

    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    #[error("Size mismatch: index holds {index} vectors, catalog holds {catalog} entries")]
    SizeMismatch { index: usize, catalog: usize },

    #[error("Metric mismatch: configured {expected}, artifact built with {actual}")]
    MetricMismatch { expected: String, actual: String },

    #[error("Missing catalog entry for vector id {id}")]
    MissingCatalogEntry { id: usize },

    #[error("Assets unavailable: {0}")]
    AssetsUnavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SearchError {
    /// Whether the caller sent something unusable, as opposed to the engine
    /// or its artifacts failing. The HTTP layer answers these with 400.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SearchError::InvalidArgument(_)
                | SearchError::InvalidQuery(_)
                | SearchError::DimensionMismatch { .. }
                | SearchError::DegenerateVector(_)
        )
    }
}
