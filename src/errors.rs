//! Error types for ragterm
//!
//! One error enum for the whole pipeline. Library code returns
//! [`Result`]; the binary wraps it in `anyhow` at the edges.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ingestion, embedding, retrieval and completion
#[derive(Error, Debug)]
pub enum RagError {
    /// Ingestion produced no chunks at all
    #[error("No PDF files or extractable text found in '{}'", .folder.display())]
    IngestionEmpty { folder: PathBuf },

    /// A single document could not be turned into text
    #[error("Failed to extract text from '{}': {reason}", .path.display())]
    Extraction { path: PathBuf, reason: String },

    /// Tokenizer or model setup errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Tensor computation errors
    #[error("Model error: {0}")]
    Model(#[from] candle_core::Error),

    /// Cache read/write errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Chunks and embedding rows disagree
    #[error("Corpus mismatch: {chunks} chunks but {rows} embedding rows")]
    CorpusMismatch { chunks: usize, rows: usize },

    /// Vectors of different length were compared or combined
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Completion service returned an error or an unusable response
    #[error("Completion service error: {0}")]
    Completion(String),

    /// Streaming transport errors
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

/// Convert anyhow errors to RagError
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Generic(format!("{:#}", err))
    }
}
