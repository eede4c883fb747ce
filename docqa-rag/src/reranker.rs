//! Reranker trait for re-scoring retrieved evidence.

use async_trait::async_trait;

use crate::document::SearchResult;
use crate::error::Result;

/// A reranker that re-scores and reorders retrieved results.
///
/// Runs after retrieval and fusion. Implementations can use cross-encoder
/// models, LLM-based scoring, or other strategies, but must return at most as
/// many results as they were given; the retriever rejects a longer list with
/// [`RagError::RerankerError`](crate::RagError::RerankerError).
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Name reported in errors and logs.
    fn name(&self) -> &str;

    /// Rerank search results given the original query.
    async fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>>;
}

/// A no-op reranker that returns results unchanged.
///
/// This is the retriever's default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    fn name(&self) -> &str {
        "noop"
    }

    async fn rerank(&self, _query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        Ok(results)
    }
}
