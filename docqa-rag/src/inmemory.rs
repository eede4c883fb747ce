//! In-memory evidence store using cosine similarity.
//!
//! This module provides [`InMemoryEvidenceStore`], an evidence store backed by
//! an insertion-ordered `Vec` protected by a `tokio::sync::RwLock`. It is
//! suitable for development, testing, and small corpora.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::store::{EvidenceStats, EvidenceStore, SearchFilter};

const BACKEND: &str = "InMemory";

#[derive(Debug)]
struct StoredChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

#[derive(Debug, Default)]
struct Inner {
    chunks: Vec<StoredChunk>,
    next_id: u64,
}

/// An in-memory evidence store using cosine similarity for search.
///
/// Chunks are embedded on [`add`](EvidenceStore::add) through the injected
/// [`EmbeddingProvider`] and kept in insertion order, which makes
/// [`list_all`](EvidenceStore::list_all) and tie-breaking deterministic.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryEvidenceStore, EvidenceStore};
///
/// let store = InMemoryEvidenceStore::new(Arc::new(embedder));
/// let ids = store.add(&chunks).await?;
/// ```
pub struct InMemoryEvidenceStore {
    embedder: Arc<dyn EmbeddingProvider>,
    inner: RwLock<Inner>,
}

impl InMemoryEvidenceStore {
    /// Create a new empty store embedding text with `embedder`.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, inner: RwLock::new(Inner::default()) }
    }

    fn embedding_failed(e: RagError) -> RagError {
        error!(backend = BACKEND, error = %e, "embedding failed");
        RagError::RetrievalError { backend: BACKEND.to_string(), message: e.to_string() }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl EvidenceStore for InMemoryEvidenceStore {
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(query).await.map_err(Self::embedding_failed)?;

        let inner = self.inner.read().await;
        let mut scored: Vec<SearchResult> = inner
            .chunks
            .iter()
            .filter(|stored| filter.is_none_or(|f| f.matches(&stored.chunk)))
            .map(|stored| SearchResult {
                chunk: stored.chunk.clone(),
                score: cosine_similarity(&stored.embedding, &query_embedding),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        debug!(backend = BACKEND, k, result_count = scored.len(), "similarity search");
        Ok(scored)
    }

    async fn list_all(&self) -> Result<Vec<Chunk>> {
        let inner = self.inner.read().await;
        Ok(inner.chunks.iter().map(|stored| stored.chunk.clone()).collect())
    }

    async fn add(&self, chunks: &[Chunk]) -> Result<Vec<String>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings =
            self.embedder.embed_batch(&texts).await.map_err(Self::embedding_failed)?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::RetrievalError {
                backend: BACKEND.to_string(),
                message: format!(
                    "embedding provider returned {} vectors for {} chunks",
                    embeddings.len(),
                    chunks.len()
                ),
            });
        }

        let mut inner = self.inner.write().await;
        let mut ids = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            let id = format!("{}-{}", chunk.document_id, inner.next_id);
            inner.next_id += 1;
            inner.chunks.push(StoredChunk { chunk: chunk.clone(), embedding });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.chunks.len();
        inner.chunks.retain(|stored| stored.chunk.document_id != document_id);
        let removed = before - inner.chunks.len();
        debug!(backend = BACKEND, document_id, removed, "deleted document");
        Ok(removed)
    }

    async fn stats(&self) -> Result<EvidenceStats> {
        let inner = self.inner.read().await;
        let documents: HashSet<&str> =
            inner.chunks.iter().map(|stored| stored.chunk.document_id.as_str()).collect();
        Ok(EvidenceStats {
            chunk_count: inner.chunks.len(),
            unique_document_count: documents.len(),
        })
    }
}

impl std::fmt::Debug for InMemoryEvidenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEvidenceStore")
            .field("dimensions", &self.embedder.dimensions())
            .finish_non_exhaustive()
    }
}
