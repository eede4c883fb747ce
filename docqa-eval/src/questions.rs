//! Test question generation from document text.

use std::sync::Arc;

use docqa_rag::{Generator, RagError};
use tracing::{error, info};

use crate::error::{EvalError, Result};

/// Characters of the document shown to the generator.
const EXCERPT_CHARS: usize = 2000;

const QUESTION_INSTRUCTIONS: &str =
    "You write evaluation questions for a document question answering system.";

/// Asks a [`Generator`] for questions a document should be able to answer.
pub struct QuestionGenerator {
    generator: Arc<dyn Generator>,
}

impl QuestionGenerator {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Generate up to `count` questions about the start of `document_text`.
    ///
    /// The reply is split into lines; blank lines are dropped and at most
    /// `count` questions are kept.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InputError`] when `count` is zero and propagates
    /// generator failures.
    pub async fn generate_questions(&self, document_text: &str, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            return Err(EvalError::InputError("question count must be greater than zero".into()));
        }

        let excerpt: String = document_text.chars().take(EXCERPT_CHARS).collect();
        let prompt = format!(
            "Based on the following document excerpt, generate {count} diverse questions that \
             could be answered using this content.\n\n\
             Include:\n\
             - Factual questions (who, what, when, where)\n\
             - Analytical questions (why, how)\n\
             - Comparison questions\n\
             - Definition questions\n\n\
             Document excerpt:\n{excerpt}\n\n\
             Generate {count} questions, one per line:"
        );

        let reply = self.generator.generate(QUESTION_INSTRUCTIONS, "", &prompt, &[]).await.map_err(
            |e| {
                error!(provider = self.generator.name(), error = %e, "question generation failed");
                EvalError::from(match e {
                    RagError::GenerationError { .. } => e,
                    other => RagError::GenerationError {
                        provider: self.generator.name().to_string(),
                        message: other.to_string(),
                    },
                })
            },
        )?;

        let questions: Vec<String> = reply
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(count)
            .map(str::to_string)
            .collect();
        info!(question_count = questions.len(), "generated questions");
        Ok(questions)
    }
}
