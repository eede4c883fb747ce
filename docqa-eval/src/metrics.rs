//! Evaluation records and report types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Quality scores for one answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// How directly the answer addresses the question, in `[0, 1]`.
    pub answer_relevance: f32,
    /// Share of citations that point at retrieved evidence, in `[0, 1]`.
    pub citation_accuracy: f32,
    /// How well the evidence supports the answer's claims, in `[0, 1]`.
    pub faithfulness: f32,
    /// Share of the top evidence chunks judged relevant, in `[0, 1]`.
    pub retrieval_precision: f32,
    /// Wall-clock time taken to answer.
    pub response_time_secs: f64,
    /// RFC 3339 time the evaluation was made.
    pub timestamp: String,
}

impl EvaluationMetrics {
    /// The answering time as a [`Duration`].
    pub fn response_time(&self) -> Duration {
        Duration::from_secs_f64(self.response_time_secs.max(0.0))
    }
}

/// One evaluated question, as kept in the evaluator's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub question: String,
    pub answer: String,
    pub metrics: EvaluationMetrics,
}

/// Per-metric means over an evaluation history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub evaluation_count: usize,
    pub avg_answer_relevance: f32,
    pub avg_citation_accuracy: f32,
    pub avg_faithfulness: f32,
    pub avg_retrieval_precision: f32,
    pub avg_response_time_secs: f64,
}

impl MetricsSummary {
    /// Average `records`; `None` when there are none.
    pub fn from_records(records: &[EvaluationRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let n = records.len();
        let mean = |f: fn(&EvaluationMetrics) -> f32| {
            records.iter().map(|r| f(&r.metrics)).sum::<f32>() / n as f32
        };

        Some(Self {
            evaluation_count: n,
            avg_answer_relevance: mean(|m| m.answer_relevance),
            avg_citation_accuracy: mean(|m| m.citation_accuracy),
            avg_faithfulness: mean(|m| m.faithfulness),
            avg_retrieval_precision: mean(|m| m.retrieval_precision),
            avg_response_time_secs: records
                .iter()
                .map(|r| r.metrics.response_time_secs)
                .sum::<f64>()
                / n as f64,
        })
    }
}

/// The document written by [`Evaluator::save_report`](crate::Evaluator::save_report).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Means over `evaluations`; absent when nothing was evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<MetricsSummary>,
    pub evaluations: Vec<EvaluationRecord>,
}
