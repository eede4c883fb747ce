//! Generator trait for producing grounded answers from formatted context.

use async_trait::async_trait;

use crate::document::ConversationTurn;
use crate::error::Result;

/// System instructions sent with every question unless the engine is built
/// with its own.
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "\
You are a document question-answering assistant. Answer strictly from the \
document context you are given.

Rules:
1. Use only information found in the context. Do not rely on outside knowledge.
2. Cite every claim with a marker of the form [Source: <filename>], adding \
, Page: <number> and , Section: <name> when the context provides them, \
for example [Source: report.pdf, Page: 3, Section: Results].
3. If the context does not contain the answer, reply starting with \
\"I don't have enough information\" and explain what is missing.
4. When several documents are relevant, say which document supports which point.
5. Be concise and precise.";

/// A language model that answers a question from retrieved context.
///
/// The engine awaits [`generate`](Generator::generate) before extracting
/// citations; the returned text is the answer verbatim.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Name reported in errors and logs.
    fn name(&self) -> &str;

    /// Produce an answer to `question` given formatted `context` and prior turns.
    ///
    /// `history` is oldest first and may be empty.
    async fn generate(
        &self,
        system_instructions: &str,
        context: &str,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<String>;
}
