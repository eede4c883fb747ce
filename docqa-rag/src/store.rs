//! Evidence store trait: chunk storage with semantic search.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// Restricts a similarity search to a subset of the stored chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Only return chunks belonging to this document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl SearchFilter {
    /// A filter matching the chunks of a single document.
    pub fn document(document_id: impl Into<String>) -> Self {
        Self { document_id: Some(document_id.into()) }
    }

    /// Whether `chunk` passes this filter.
    pub fn matches(&self, chunk: &Chunk) -> bool {
        self.document_id.as_deref().is_none_or(|id| chunk.document_id == id)
    }
}

/// Size of the stored corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceStats {
    pub chunk_count: usize,
    pub unique_document_count: usize,
}

/// Storage backend holding the chunks that questions are answered from.
///
/// Implementations own the chunks and their embeddings. The engine keeps its
/// own lexical index over [`list_all`](EvidenceStore::list_all), so a store
/// only has to provide semantic search.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{EvidenceStore, InMemoryEvidenceStore};
///
/// let store = InMemoryEvidenceStore::new(Arc::new(my_embedder));
/// store.add(&chunks).await?;
/// let results = store.similarity_search("what is BM25?", 10, None).await?;
/// ```
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Return up to `k` chunks ordered by descending similarity to `query`.
    ///
    /// Scores are roughly in `[0, 1]`. No similarity threshold is applied;
    /// callers filter.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchResult>>;

    /// Return every stored chunk in a stable order.
    async fn list_all(&self) -> Result<Vec<Chunk>>;

    /// Store chunks and return their assigned ids.
    async fn add(&self, chunks: &[Chunk]) -> Result<Vec<String>>;

    /// Remove every chunk of a document. Returns the number of chunks removed.
    async fn delete_by_document(&self, document_id: &str) -> Result<usize>;

    /// Report corpus size.
    async fn stats(&self) -> Result<EvidenceStats>;
}
