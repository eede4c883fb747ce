//! Error types for the `docqa-eval` crate.

use docqa_rag::RagError;
use thiserror::Error;

/// Errors that can occur while evaluating answers or writing reports.
///
/// Judge calls that fail or return an unparsable score are not errors; the
/// evaluator substitutes a neutral score instead.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A collaborator from the engine crate failed.
    #[error(transparent)]
    Rag(#[from] RagError),

    /// Writing the report failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the report failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The caller supplied an out-of-range parameter.
    #[error("Invalid input: {0}")]
    InputError(String),
}

/// A convenience result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;
