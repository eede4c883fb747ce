//! Answer quality evaluation for `docqa-rag`.
//!
//! This crate provides:
//! - [`Evaluator`]: answer relevance, citation accuracy, faithfulness and
//!   retrieval precision for a [`QueryResponse`](docqa_rag::QueryResponse),
//!   with a running history and JSON reports
//! - [`QuestionGenerator`]: test questions drafted from document text

mod error;
mod evaluator;
mod metrics;
mod questions;

pub use error::{EvalError, Result};
pub use evaluator::{
    DEFAULT_PRECISION_K, Evaluator, NEUTRAL_SCORE, citation_accuracy, parse_score,
};
pub use metrics::{EvaluationMetrics, EvaluationRecord, EvaluationReport, MetricsSummary};
pub use questions::QuestionGenerator;
