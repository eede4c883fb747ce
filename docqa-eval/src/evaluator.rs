//! LLM-judged answer evaluation.
//!
//! The [`Evaluator`] scores a [`QueryResponse`] on four metrics. Citation
//! accuracy is computed directly; answer relevance, faithfulness and retrieval
//! precision ask a judge [`Generator`]. Judging never fails an evaluation: a
//! failed or unparsable judgement falls back to [`NEUTRAL_SCORE`] (or, for
//! retrieval precision, counts the chunk as not relevant).
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_eval::Evaluator;
//!
//! let mut evaluator = Evaluator::new(Arc::new(judge));
//! let started = Instant::now();
//! let response = engine.query(question, SearchMode::Hybrid, false).await?;
//! let metrics = evaluator.evaluate_response(question, &response, started.elapsed()).await;
//! evaluator.save_report("eval_report.json").await?;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use docqa_rag::{Chunk, Citation, Generator, QueryResponse};
use tracing::{info, warn};

use crate::error::Result;
use crate::metrics::{EvaluationMetrics, EvaluationRecord, EvaluationReport, MetricsSummary};

/// Score used when a judgement cannot be obtained.
pub const NEUTRAL_SCORE: f32 = 0.5;

/// Number of evidence chunks shown to the judge when rating faithfulness.
const FAITHFULNESS_CHUNKS: usize = 3;

/// Default number of top chunks rated for retrieval precision.
pub const DEFAULT_PRECISION_K: usize = 5;

/// Characters of each chunk shown to the judge when rating precision.
const PRECISION_PREVIEW_CHARS: usize = 500;

/// Uncited answers longer than this many words score zero citation accuracy.
const UNCITED_WORD_LIMIT: usize = 20;

const JUDGE_INSTRUCTIONS: &str = "You are a strict evaluator of question answering systems. \
Reply with exactly what is asked for and nothing else.";

/// Scores answers and keeps a history of every evaluation.
pub struct Evaluator {
    judge: Arc<dyn Generator>,
    history: Vec<EvaluationRecord>,
}

impl Evaluator {
    /// Create an evaluator that asks `judge` for its ratings.
    pub fn new(judge: Arc<dyn Generator>) -> Self {
        Self { judge, history: Vec::new() }
    }

    /// Every evaluation so far, oldest first.
    pub fn history(&self) -> &[EvaluationRecord] {
        &self.history
    }

    /// Rate how directly `answer` addresses `question`, in `[0, 1]`.
    pub async fn answer_relevance(&self, question: &str, answer: &str) -> f32 {
        let prompt = format!(
            "Evaluate the relevance of the answer to the question on a scale of 0-1.\n\n\
             Question: {question}\n\n\
             Answer: {answer}\n\n\
             Provide only a number between 0 and 1, where:\n\
             - 1.0 = Perfectly relevant and directly answers the question\n\
             - 0.5 = Partially relevant but misses key points\n\
             - 0.0 = Completely irrelevant\n\n\
             Score:"
        );
        self.judge_score("answer_relevance", &prompt).await
    }

    /// Rate whether `answer` only makes claims supported by the first
    /// evidence chunks, in `[0, 1]`.
    pub async fn faithfulness(&self, answer: &str, evidence: &[Chunk]) -> f32 {
        let context = evidence
            .iter()
            .take(FAITHFULNESS_CHUNKS)
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "Evaluate if the answer is faithful to the provided context. Check if the answer \
             makes claims that are not supported by the context.\n\n\
             Context:\n{context}\n\n\
             Answer:\n{answer}\n\n\
             Rate faithfulness on a scale of 0-1:\n\
             - 1.0 = All claims are directly supported by context\n\
             - 0.5 = Some claims go beyond context\n\
             - 0.0 = Answer contradicts or is unrelated to context\n\n\
             Score:"
        );
        self.judge_score("faithfulness", &prompt).await
    }

    /// Precision@k: the share of the top `k` evidence chunks the judge deems
    /// relevant to `question`. Empty evidence scores `0.0`.
    pub async fn retrieval_precision(&self, question: &str, evidence: &[Chunk], k: usize) -> f32 {
        let rated: Vec<&Chunk> = evidence.iter().take(k).collect();
        if rated.is_empty() {
            return 0.0;
        }

        let mut relevant = 0usize;
        for chunk in &rated {
            let preview: String = chunk.text.chars().take(PRECISION_PREVIEW_CHARS).collect();
            let prompt = format!(
                "Is this document chunk relevant to answering the question?\n\n\
                 Question: {question}\n\n\
                 Chunk: {preview}...\n\n\
                 Answer with only 'yes' or 'no':"
            );
            match self.judge.generate(JUDGE_INSTRUCTIONS, "", &prompt, &[]).await {
                Ok(verdict) if verdict.trim().eq_ignore_ascii_case("yes") => relevant += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(metric = "retrieval_precision", error = %e, "judge failed, counting chunk as not relevant");
                }
            }
        }
        relevant as f32 / rated.len() as f32
    }

    /// Score and record one answered question.
    pub async fn evaluate_response(
        &mut self,
        question: &str,
        response: &QueryResponse,
        response_time: Duration,
    ) -> EvaluationMetrics {
        let answer_relevance = self.answer_relevance(question, &response.answer).await;
        let citation_accuracy =
            citation_accuracy(&response.answer, &response.citations, &response.evidence);
        let faithfulness = self.faithfulness(&response.answer, &response.evidence).await;
        let retrieval_precision =
            self.retrieval_precision(question, &response.evidence, DEFAULT_PRECISION_K).await;

        let metrics = EvaluationMetrics {
            answer_relevance,
            citation_accuracy,
            faithfulness,
            retrieval_precision,
            response_time_secs: response_time.as_secs_f64(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        info!(
            answer_relevance,
            citation_accuracy,
            faithfulness,
            retrieval_precision,
            response_time_secs = metrics.response_time_secs,
            "evaluated response"
        );

        self.history.push(EvaluationRecord {
            question: question.to_string(),
            answer: response.answer.clone(),
            metrics: metrics.clone(),
        });
        metrics
    }

    /// Per-metric means over the history; `None` before the first evaluation.
    pub fn average_metrics(&self) -> Option<MetricsSummary> {
        MetricsSummary::from_records(&self.history)
    }

    /// The summary and every evaluation, as written by [`save_report`](Self::save_report).
    pub fn report(&self) -> EvaluationReport {
        EvaluationReport { summary: self.average_metrics(), evaluations: self.history.clone() }
    }

    /// Write [`report`](Self::report) to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Io`](crate::EvalError::Io) if the file cannot be
    /// written.
    pub async fn save_report(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.report())?;
        tokio::fs::write(path, json).await?;
        info!(path = %path.display(), evaluation_count = self.history.len(), "saved evaluation report");
        Ok(())
    }

    async fn judge_score(&self, metric: &'static str, prompt: &str) -> f32 {
        match self.judge.generate(JUDGE_INSTRUCTIONS, "", prompt, &[]).await {
            Ok(reply) => parse_score(&reply).unwrap_or_else(|| {
                warn!(metric, reply = %reply.trim(), "unparsable judge score, using neutral score");
                NEUTRAL_SCORE
            }),
            Err(e) => {
                warn!(metric, error = %e, "judge failed, using neutral score");
                NEUTRAL_SCORE
            }
        }
    }
}

/// Parse a judge's reply as a score, clamped to `[0, 1]`.
///
/// The reply must be a bare number (surrounding whitespace allowed).
pub fn parse_score(reply: &str) -> Option<f32> {
    reply.trim().parse::<f32>().ok().filter(|s| s.is_finite()).map(|s| s.clamp(0.0, 1.0))
}

/// Share of `citations` that point at a chunk of `evidence`.
///
/// A citation is valid when some evidence chunk has the same file name and,
/// if the citation names a page, the same page. With no citations, answers of
/// more than 20 words score `0.0` and shorter ones `0.5`.
pub fn citation_accuracy(answer: &str, citations: &[Citation], evidence: &[Chunk]) -> f32 {
    if citations.is_empty() {
        return if answer.split_whitespace().count() > UNCITED_WORD_LIMIT {
            0.0
        } else {
            NEUTRAL_SCORE
        };
    }

    let valid = citations
        .iter()
        .filter(|citation| {
            evidence.iter().any(|chunk| {
                chunk.source_filename == citation.source
                    && citation.page.is_none_or(|page| chunk.page == Some(page))
            })
        })
        .count();
    valid as f32 / citations.len() as f32
}
