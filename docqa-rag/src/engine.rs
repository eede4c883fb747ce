//! Question answering orchestrator.
//!
//! The [`QueryEngine`] runs one question at a time through
//! retrieve → rerank → format → generate → cite → score, and keeps a bounded
//! conversation history between questions.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{EngineConfig, InMemoryEvidenceStore, QueryEngine, SearchMode};
//!
//! let mut engine = QueryEngine::builder()
//!     .config(EngineConfig::default())
//!     .evidence_store(Arc::new(InMemoryEvidenceStore::new(Arc::new(my_embedder))))
//!     .generator(Arc::new(my_generator))
//!     .build()?;
//!
//! engine.add_evidence(&chunks).await?;
//! let response = engine.query("What is BM25?", SearchMode::Hybrid, true).await?;
//! println!("{} ({:.2})", response.answer, response.confidence);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info};

use crate::citation::extract_citations;
use crate::confidence::estimate_confidence;
use crate::config::EngineConfig;
use crate::context::format_context;
use crate::document::{Chunk, ConversationTurn, QueryResponse, SearchResult};
use crate::error::{RagError, Result};
use crate::generator::{DEFAULT_SYSTEM_INSTRUCTIONS, Generator};
use crate::reranker::Reranker;
use crate::retrieval::{HybridRetriever, SearchMode};
use crate::store::{EvidenceStats, EvidenceStore, SearchFilter};

/// Answer returned when retrieval finds nothing.
pub const NO_RESULTS_ANSWER: &str =
    "I couldn't find any relevant information in the documents to answer this question.";

impl QueryResponse {
    /// The fixed response for a question with no relevant evidence.
    pub fn no_results() -> Self {
        Self {
            answer: NO_RESULTS_ANSWER.to_string(),
            citations: Vec::new(),
            confidence: 0.0,
            evidence: Vec::new(),
        }
    }
}

/// The question answering engine.
///
/// Owns the retriever (and through it the lexical index), the generator and
/// the conversation history. [`query`](Self::query) takes `&mut self`, so one
/// engine answers one question at a time; use one engine per conversation.
/// Construct one via [`QueryEngine::builder()`].
pub struct QueryEngine {
    retriever: HybridRetriever,
    generator: Arc<dyn Generator>,
    system_instructions: String,
    history: Vec<ConversationTurn>,
}

impl QueryEngine {
    /// Create a new [`QueryEngineBuilder`].
    pub fn builder() -> QueryEngineBuilder {
        QueryEngineBuilder::default()
    }

    /// Return a reference to the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        self.retriever.config()
    }

    /// Return a reference to the retriever.
    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    /// Return a reference to the evidence store.
    pub fn evidence_store(&self) -> &Arc<dyn EvidenceStore> {
        self.retriever.store()
    }

    /// The retained conversation, oldest entry first.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Forget the conversation so far.
    pub fn clear_history(&mut self) {
        self.history.clear();
        info!("conversation history cleared");
    }

    /// Answer `question` from the stored evidence.
    ///
    /// Retrieves the configured `top_k` chunks in `mode`, shows them to the
    /// generator and grounds the answer with citations and a confidence score.
    /// Prior turns are sent along only when `use_history` is set and memory is
    /// enabled. With memory enabled the question and answer are appended to
    /// the history, which is then trimmed to the configured limit.
    ///
    /// When nothing relevant is retrieved the generator is not called and
    /// [`QueryResponse::no_results`] is returned; the history is left as is.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InputError`] for an empty question, and propagates
    /// retrieval, reranking and generation failures.
    pub async fn query(
        &mut self,
        question: &str,
        mode: SearchMode,
        use_history: bool,
    ) -> Result<QueryResponse> {
        let question = validate_question(question)?;
        let config = self.retriever.config();
        let (top_k, memory_enabled) = (config.top_k, config.memory_enabled);

        let results = self.retriever.retrieve(question, mode, top_k).await?;
        if results.is_empty() {
            info!(%mode, "no relevant evidence found");
            return Ok(QueryResponse::no_results());
        }

        let evidence = dedup_by_text(results);
        let context = format_context(&evidence);
        let history: &[ConversationTurn] =
            if use_history && memory_enabled { &self.history } else { &[] };
        let answer = self.generate(&context, question, history).await?;
        let response = self.ground(answer, evidence);

        if memory_enabled {
            self.remember(question, &response.answer);
        }

        info!(
            %mode,
            evidence_count = response.evidence.len(),
            citation_count = response.citations.len(),
            confidence = response.confidence,
            "query completed"
        );
        Ok(response)
    }

    /// Answer a comparative question across several documents.
    ///
    /// Runs a semantic search restricted to each document (similarity
    /// threshold applied), keeps the best `2 * top_k` chunks overall and asks
    /// the generator for a structured comparison. The conversation history is
    /// neither sent nor updated.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InputError`] for an empty question or document
    /// list, and propagates retrieval and generation failures.
    pub async fn compare_documents(
        &self,
        question: &str,
        document_ids: &[String],
    ) -> Result<QueryResponse> {
        let question = validate_question(question)?;
        if document_ids.is_empty() {
            return Err(RagError::InputError(
                "at least one document id is required for comparison".to_string(),
            ));
        }
        let top_k = self.retriever.config().top_k;

        let mut merged = Vec::new();
        for document_id in document_ids {
            let filter = SearchFilter::document(document_id.as_str());
            merged.extend(self.retriever.vector_search(question, top_k, Some(&filter)).await?);
        }
        if merged.is_empty() {
            info!(document_count = document_ids.len(), "no relevant evidence found for comparison");
            return Ok(QueryResponse::no_results());
        }

        merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        merged.truncate(top_k.saturating_mul(2));

        let evidence = dedup_by_text(merged);
        let context = format_context(&evidence);
        let comparison = format!(
            "Compare the documents with respect to this question: {question}\n\n\
             Structure the answer as:\n\
             1. What each document says\n\
             2. Similarities\n\
             3. Differences\n\
             4. Conclusion"
        );
        let answer = self.generate(&context, &comparison, &[]).await?;
        let response = self.ground(answer, evidence);

        info!(
            document_count = document_ids.len(),
            evidence_count = response.evidence.len(),
            citation_count = response.citations.len(),
            "comparison completed"
        );
        Ok(response)
    }

    /// Store new chunks and rebuild the lexical index over the whole corpus.
    ///
    /// Returns the ids assigned by the store.
    ///
    /// # Errors
    ///
    /// Propagates evidence store failures. If storing succeeds but the
    /// rebuild fails, the previous index stays in place.
    pub async fn add_evidence(&mut self, chunks: &[Chunk]) -> Result<Vec<String>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.retriever.store().add(chunks).await.inspect_err(|e| {
            error!(chunk_count = chunks.len(), error = %e, "storing evidence failed");
        })?;
        self.retriever.rebuild_index().await?;

        info!(chunk_count = ids.len(), "added evidence");
        Ok(ids)
    }

    /// Remove every chunk of a document and rebuild the lexical index.
    ///
    /// Returns the number of chunks removed.
    ///
    /// # Errors
    ///
    /// Propagates evidence store failures.
    pub async fn delete_document(&mut self, document_id: &str) -> Result<usize> {
        let removed = self.retriever.store().delete_by_document(document_id).await.inspect_err(
            |e| {
                error!(document.id = document_id, error = %e, "deleting document failed");
            },
        )?;
        self.retriever.rebuild_index().await?;

        info!(document.id = document_id, chunk_count = removed, "deleted document");
        Ok(removed)
    }

    /// Rebuild the lexical index from the store's current contents.
    ///
    /// Only needed when the store changes outside this engine;
    /// [`add_evidence`](Self::add_evidence) and
    /// [`delete_document`](Self::delete_document) rebuild on their own, and the
    /// first query builds the index if nothing has yet.
    pub async fn rebuild_index(&self) -> Result<usize> {
        self.retriever.rebuild_index().await
    }

    /// Report the size of the stored corpus.
    ///
    /// # Errors
    ///
    /// Propagates evidence store failures.
    pub async fn stats(&self) -> Result<EvidenceStats> {
        self.retriever.store().stats().await.inspect_err(|e| {
            error!(error = %e, "reading evidence stats failed");
        })
    }

    async fn generate(
        &self,
        context: &str,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<String> {
        let provider = self.generator.name();
        self.generator
            .generate(&self.system_instructions, context, question, history)
            .await
            .map_err(|e| {
                error!(provider, error = %e, "generation failed");
                match e {
                    RagError::GenerationError { .. } => e,
                    other => RagError::GenerationError {
                        provider: provider.to_string(),
                        message: other.to_string(),
                    },
                }
            })
    }

    fn ground(&self, answer: String, evidence: Vec<SearchResult>) -> QueryResponse {
        let scores: Vec<f32> = evidence.iter().map(|r| r.score).collect();
        let evidence: Vec<Chunk> = evidence.into_iter().map(|r| r.chunk).collect();
        let citations = extract_citations(&answer, &evidence, self.config().excerpt_chars);
        let confidence = estimate_confidence(&answer, &scores, citations.len());
        QueryResponse { answer, citations, confidence, evidence }
    }

    fn remember(&mut self, question: &str, answer: &str) {
        self.history.push(ConversationTurn::user(question));
        self.history.push(ConversationTurn::assistant(answer));
        let limit = self.retriever.config().history_limit;
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }
}

fn validate_question(question: &str) -> Result<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(RagError::InputError("question must not be empty".to_string()));
    }
    Ok(question)
}

/// Keep the first result for each distinct chunk text.
fn dedup_by_text(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results.into_iter().filter(|r| seen.insert(r.chunk.text.clone())).collect()
}

/// Builder for constructing a [`QueryEngine`].
///
/// `config`, `evidence_store` and `generator` are required. Call
/// [`build()`](QueryEngineBuilder::build) to validate and produce the engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = QueryEngine::builder()
///     .config(EngineConfig::from_env()?)
///     .evidence_store(Arc::new(store))
///     .generator(Arc::new(generator))
///     .reranker(Arc::new(reranker))  // optional
///     .system_instructions("Answer in French.")  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct QueryEngineBuilder {
    config: Option<EngineConfig>,
    evidence_store: Option<Arc<dyn EvidenceStore>>,
    generator: Option<Arc<dyn Generator>>,
    reranker: Option<Arc<dyn Reranker>>,
    system_instructions: Option<String>,
}

impl QueryEngineBuilder {
    /// Set the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the evidence store backend.
    pub fn evidence_store(mut self, store: Arc<dyn EvidenceStore>) -> Self {
        self.evidence_store = Some(store);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set an optional reranker applied after retrieval.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Override [`DEFAULT_SYSTEM_INSTRUCTIONS`].
    pub fn system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.system_instructions = Some(instructions.into());
        self
    }

    /// Build the [`QueryEngine`], validating that all required fields are set.
    ///
    /// The lexical index is built from the store by the first query that
    /// needs it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<QueryEngine> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let evidence_store = self
            .evidence_store
            .ok_or_else(|| RagError::ConfigError("evidence_store is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;

        let mut retriever = HybridRetriever::new(evidence_store, config);
        if let Some(reranker) = self.reranker {
            retriever = retriever.with_reranker(reranker);
        }

        Ok(QueryEngine {
            retriever,
            generator,
            system_instructions: self
                .system_instructions
                .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTIONS.to_string()),
            history: Vec::new(),
        })
    }
}
