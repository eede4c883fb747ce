//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while retrieving evidence or answering a question.
///
/// Malformed citation markers and degenerate score lists are deliberately
/// absent: both are handled by fallbacks and never surface as errors.
#[derive(Debug, Error)]
pub enum RagError {
    /// The caller supplied an empty question or an out-of-range parameter.
    #[error("Invalid input: {0}")]
    InputError(String),

    /// The evidence store failed to answer a query or mutation.
    #[error("Retrieval error ({backend}): {message}")]
    RetrievalError {
        /// The evidence store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The answer generator failed.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during result reranking.
    #[error("Reranker error ({reranker}): {message}")]
    RerankerError {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
