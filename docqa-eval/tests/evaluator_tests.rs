//! Integration tests for the evaluator with scripted judges.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docqa_eval::{EvalError, EvaluationReport, Evaluator, NEUTRAL_SCORE, QuestionGenerator};
use docqa_rag::{Chunk, Citation, ConversationTurn, Generator, QueryResponse, RagError};

/// Rates every score prompt `0.9` and says `yes` only to chunks mentioning
/// mitochondria.
struct KeywordJudge;

#[async_trait]
impl Generator for KeywordJudge {
    fn name(&self) -> &str {
        "keyword-judge"
    }

    async fn generate(
        &self,
        _system_instructions: &str,
        _context: &str,
        question: &str,
        _history: &[ConversationTurn],
    ) -> docqa_rag::Result<String> {
        if question.contains("'yes' or 'no'") {
            let chunk = question.split("Chunk: ").nth(1).unwrap_or_default();
            return Ok(if chunk.contains("mitochondria") { " Yes\n" } else { "no" }.to_string());
        }
        Ok("0.9".to_string())
    }
}

/// Replies with a fixed text.
struct FixedJudge(&'static str);

#[async_trait]
impl Generator for FixedJudge {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(
        &self,
        _system_instructions: &str,
        _context: &str,
        _question: &str,
        _history: &[ConversationTurn],
    ) -> docqa_rag::Result<String> {
        Ok(self.0.to_string())
    }
}

struct DownJudge;

#[async_trait]
impl Generator for DownJudge {
    fn name(&self) -> &str {
        "down"
    }

    async fn generate(
        &self,
        _system_instructions: &str,
        _context: &str,
        _question: &str,
        _history: &[ConversationTurn],
    ) -> docqa_rag::Result<String> {
        Err(RagError::GenerationError { provider: "down".into(), message: "timeout".into() })
    }
}

fn response() -> QueryResponse {
    QueryResponse {
        answer: "The mitochondria is the powerhouse of the cell. [Source: bio.txt]".into(),
        citations: vec![Citation {
            source: "bio.txt".into(),
            page: None,
            section: None,
            excerpt: "The mitochondria is the powerhouse of the cell.".into(),
        }],
        confidence: 0.8,
        evidence: vec![
            Chunk::new("The mitochondria is the powerhouse of the cell.", "bio.txt", "bio"),
            Chunk::new("Paris is the capital of France.", "geo.txt", "geo"),
        ],
    }
}

#[tokio::test]
async fn evaluates_and_records_a_response() {
    let mut evaluator = Evaluator::new(Arc::new(KeywordJudge));

    let metrics = evaluator
        .evaluate_response("What is the mitochondria?", &response(), Duration::from_millis(1500))
        .await;

    assert!((metrics.answer_relevance - 0.9).abs() < 1e-6);
    assert_eq!(metrics.citation_accuracy, 1.0);
    assert!((metrics.faithfulness - 0.9).abs() < 1e-6);
    assert_eq!(metrics.retrieval_precision, 0.5);
    assert!((metrics.response_time_secs - 1.5).abs() < 1e-9);
    assert!(chrono::DateTime::parse_from_rfc3339(&metrics.timestamp).is_ok());

    assert_eq!(evaluator.history().len(), 1);
    assert_eq!(evaluator.history()[0].question, "What is the mitochondria?");
    assert_eq!(evaluator.average_metrics().unwrap().evaluation_count, 1);
}

#[tokio::test]
async fn unparsable_or_failed_judgements_fall_back_to_neutral() {
    let chatty = Evaluator::new(Arc::new(FixedJudge("I would say about 0.7")));
    assert_eq!(chatty.answer_relevance("q", "a").await, NEUTRAL_SCORE);
    assert_eq!(chatty.faithfulness("a", &response().evidence).await, NEUTRAL_SCORE);

    let down = Evaluator::new(Arc::new(DownJudge));
    assert_eq!(down.answer_relevance("q", "a").await, NEUTRAL_SCORE);
    assert_eq!(down.faithfulness("a", &response().evidence).await, NEUTRAL_SCORE);
    assert_eq!(down.retrieval_precision("q", &response().evidence, 5).await, 0.0);
}

#[tokio::test]
async fn judge_scores_are_clamped() {
    let generous = Evaluator::new(Arc::new(FixedJudge("4.5")));
    assert_eq!(generous.answer_relevance("q", "a").await, 1.0);
}

#[tokio::test]
async fn retrieval_precision_only_rates_top_k() {
    let evaluator = Evaluator::new(Arc::new(KeywordJudge));
    let evidence = response().evidence;

    assert_eq!(evaluator.retrieval_precision("q", &evidence, 1).await, 1.0);
    assert_eq!(evaluator.retrieval_precision("q", &evidence, 5).await, 0.5);
    assert_eq!(evaluator.retrieval_precision("q", &[], 5).await, 0.0);
}

#[tokio::test]
async fn saves_report_as_json() {
    let mut evaluator = Evaluator::new(Arc::new(KeywordJudge));
    evaluator.evaluate_response("first?", &response(), Duration::from_secs(1)).await;
    evaluator.evaluate_response("second?", &response(), Duration::from_secs(3)).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    evaluator.save_report(&path).await.unwrap();

    let report: EvaluationReport =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(report.evaluations.len(), 2);
    let summary = report.summary.unwrap();
    assert_eq!(summary.evaluation_count, 2);
    assert!((summary.avg_response_time_secs - 2.0).abs() < 1e-9);
    assert_eq!(report, evaluator.report());
}

#[tokio::test]
async fn save_report_surfaces_io_errors() {
    let evaluator = Evaluator::new(Arc::new(KeywordJudge));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("report.json");

    assert!(matches!(evaluator.save_report(&path).await, Err(EvalError::Io(_))));
}

#[tokio::test]
async fn generates_trimmed_questions_up_to_count() {
    let generator = QuestionGenerator::new(Arc::new(FixedJudge(
        "1. What is ATP?\n\n   2. Why do cells divide?  \n3. Where is Paris?\n",
    )));

    let questions = generator.generate_questions("Some document text.", 2).await.unwrap();
    assert_eq!(questions, vec!["1. What is ATP?", "2. Why do cells divide?"]);

    assert!(matches!(
        generator.generate_questions("text", 0).await,
        Err(EvalError::InputError(_))
    ));
}

#[tokio::test]
async fn question_generation_propagates_generator_failure() {
    let generator = QuestionGenerator::new(Arc::new(DownJudge));
    let err = generator.generate_questions("text", 3).await.unwrap_err();
    assert!(matches!(err, EvalError::Rag(RagError::GenerationError { .. })));
}
