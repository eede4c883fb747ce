//! Hybrid retrieval: BM25 and semantic search fused into one ranking.
//!
//! [`HybridRetriever`] owns the lexical index and borrows semantic search from
//! an [`EvidenceStore`]. Three modes are supported:
//!
//! - [`SearchMode::Vector`]: the store's top-`k`, minus results below the
//!   similarity threshold
//! - [`SearchMode::Keyword`]: the BM25 top-`k`, no threshold
//! - [`SearchMode::Hybrid`]: both rankers over-fetch, each list is min-max
//!   normalized, and the union is ranked by
//!   `alpha * semantic + (1 - alpha) * lexical`
//!
//! Every mode finishes with the configured [`Reranker`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::lexical::{Bm25Params, LexicalIndex};
use crate::normalize::normalize_scores;
use crate::reranker::{NoOpReranker, Reranker};
use crate::store::{EvidenceStore, SearchFilter};

/// Which ranker(s) answer a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Hybrid,
    Vector,
    Keyword,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::Vector => "vector",
            Self::Keyword => "keyword",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "vector" => Ok(Self::Vector),
            "keyword" => Ok(Self::Keyword),
            other => Err(RagError::InputError(format!(
                "unknown search mode '{other}', expected hybrid, vector or keyword"
            ))),
        }
    }
}

/// Combine a semantic and a lexical ranking by weighted normalized score.
///
/// Each list is normalized independently. Chunks are identified by their exact
/// text, so two chunks with the same text and different metadata count as one
/// (the first one encountered is kept). A chunk missing from one list
/// contributes `0` for that list. Within a single list only the first
/// appearance of a text counts.
///
/// The result holds at most `k` entries sorted by combined score; ties keep
/// first-encounter order, with the semantic list scanned before the lexical one.
pub fn fuse(
    semantic: Vec<SearchResult>,
    lexical: Vec<SearchResult>,
    alpha: f32,
    k: usize,
) -> Vec<SearchResult> {
    struct Candidate {
        chunk: Chunk,
        semantic: Option<f32>,
        lexical: Option<f32>,
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut by_text: HashMap<String, usize> = HashMap::new();

    for result in normalize_scores(semantic) {
        if by_text.contains_key(&result.chunk.text) {
            continue;
        }
        by_text.insert(result.chunk.text.clone(), candidates.len());
        candidates.push(Candidate { chunk: result.chunk, semantic: Some(result.score), lexical: None });
    }

    for result in normalize_scores(lexical) {
        match by_text.get(&result.chunk.text) {
            Some(&idx) => {
                let candidate = &mut candidates[idx];
                if candidate.lexical.is_none() {
                    candidate.lexical = Some(result.score);
                }
            }
            None => {
                by_text.insert(result.chunk.text.clone(), candidates.len());
                candidates.push(Candidate {
                    chunk: result.chunk,
                    semantic: None,
                    lexical: Some(result.score),
                });
            }
        }
    }

    let mut fused: Vec<SearchResult> = candidates
        .into_iter()
        .map(|c| SearchResult {
            score: alpha * c.semantic.unwrap_or(0.0) + (1.0 - alpha) * c.lexical.unwrap_or(0.0),
            chunk: c.chunk,
        })
        .collect();

    // Stable sort: equal scores keep first-encounter order.
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(k);
    fused
}

/// Retrieves ranked evidence for a query from an [`EvidenceStore`] and a BM25 index.
///
/// The lexical index is a snapshot of [`EvidenceStore::list_all`] taken by
/// [`rebuild_index`](Self::rebuild_index), or by the first search that needs it
/// if no rebuild has happened yet. Rebuilds construct a fresh index and swap it
/// in under a write lock, so searches never see a partial index; the snapshot
/// goes stale whenever the store changes behind the retriever's back.
pub struct HybridRetriever {
    store: Arc<dyn EvidenceStore>,
    reranker: Arc<dyn Reranker>,
    /// `None` until the first build.
    lexical: RwLock<Option<Arc<LexicalIndex>>>,
    config: EngineConfig,
}

impl HybridRetriever {
    /// Create a retriever with no reranking.
    ///
    /// The lexical index is built from the store on first use.
    pub fn new(store: Arc<dyn EvidenceStore>, config: EngineConfig) -> Self {
        Self {
            store,
            reranker: Arc::new(NoOpReranker),
            lexical: RwLock::new(None),
            config,
        }
    }

    /// Replace the default pass-through reranker.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Return a reference to the evidence store.
    pub fn store(&self) -> &Arc<dyn EvidenceStore> {
        &self.store
    }

    /// Return a reference to the retrieval configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn bm25_params(&self) -> Bm25Params {
        Bm25Params { k1: self.config.bm25_k1, b: self.config.bm25_b }
    }

    /// Rebuild the lexical index from every chunk in the store.
    ///
    /// Returns the number of indexed chunks.
    ///
    /// # Errors
    ///
    /// Propagates the store's error if listing chunks fails; the previous
    /// index stays in place.
    pub async fn rebuild_index(&self) -> Result<usize> {
        Ok(self.build_index().await?.len())
    }

    async fn build_index(&self) -> Result<Arc<LexicalIndex>> {
        let chunks = self.store.list_all().await.inspect_err(|e| {
            error!(error = %e, "listing chunks for lexical index failed");
        })?;
        let index = Arc::new(LexicalIndex::build(chunks, self.bm25_params()));
        let chunk_count = index.len();
        *self.lexical.write().await = Some(Arc::clone(&index));
        info!(chunk_count, "rebuilt lexical index");
        Ok(index)
    }

    /// Whether the lexical index has been built at least once.
    pub async fn is_index_built(&self) -> bool {
        self.lexical.read().await.is_some()
    }

    async fn current_index(&self) -> Result<Arc<LexicalIndex>> {
        if let Some(index) = self.lexical.read().await.as_ref() {
            return Ok(Arc::clone(index));
        }
        debug!("lexical index not built yet, building from store");
        self.build_index().await
    }

    /// BM25 search over the current index snapshot.
    ///
    /// # Errors
    ///
    /// Propagates the store's error if the index has never been built and
    /// listing chunks for it fails. Once built, searching never fails.
    pub async fn keyword_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        Ok(self.current_index().await?.search(query, k))
    }

    /// Semantic search, dropping results below the similarity threshold.
    ///
    /// # Errors
    ///
    /// Propagates the evidence store's error.
    pub async fn vector_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchResult>> {
        let results = self.store.similarity_search(query, k, filter).await.inspect_err(|e| {
            error!(error = %e, "semantic search failed");
        })?;
        let threshold = self.config.similarity_threshold;
        Ok(results.into_iter().filter(|r| r.score >= threshold).collect())
    }

    /// Fuse semantic and BM25 rankings with semantic weight `alpha`.
    ///
    /// Each ranker is asked for `overfetch_factor * k` candidates; see [`fuse`]
    /// for how they are combined.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InputError`] if `alpha` is outside `[0, 1]`, and
    /// propagates evidence store errors.
    pub async fn hybrid_search(&self, query: &str, k: usize, alpha: f32) -> Result<Vec<SearchResult>> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(RagError::InputError(format!("alpha ({alpha}) must be within [0, 1]")));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.config.candidate_count(k);
        let semantic = self.vector_search(query, candidates, None).await?;
        let lexical = self.keyword_search(query, candidates).await?;
        debug!(
            semantic_count = semantic.len(),
            lexical_count = lexical.len(),
            candidates,
            "fusing candidate lists"
        );

        Ok(fuse(semantic, lexical, alpha, k))
    }

    /// Retrieve the top-`k` evidence for `query` in the given mode, then rerank.
    ///
    /// Hybrid mode uses the configured `hybrid_alpha`.
    ///
    /// # Errors
    ///
    /// Propagates evidence store and reranker errors.
    pub async fn retrieve(&self, query: &str, mode: SearchMode, k: usize) -> Result<Vec<SearchResult>> {
        let results = match mode {
            SearchMode::Hybrid => self.hybrid_search(query, k, self.config.hybrid_alpha).await?,
            SearchMode::Vector => self.vector_search(query, k, None).await?,
            SearchMode::Keyword => self.keyword_search(query, k).await?,
        };
        let results = self.rerank(query, results).await?;
        info!(%mode, result_count = results.len(), "retrieval completed");
        Ok(results)
    }

    /// Pass `results` through the configured reranker.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RerankerError`] if the reranker fails or returns
    /// more results than it was given.
    pub async fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        let given = results.len();
        let reranker = self.reranker.name().to_string();
        let reranked = self.reranker.rerank(query, results).await.map_err(|e| {
            error!(reranker = %reranker, error = %e, "reranking failed");
            match e {
                RagError::RerankerError { .. } => e,
                other => RagError::RerankerError {
                    reranker: reranker.clone(),
                    message: other.to_string(),
                },
            }
        })?;
        if reranked.len() > given {
            error!(reranker = %reranker, given, returned = reranked.len(), "reranker grew result list");
            return Err(RagError::RerankerError {
                reranker,
                message: format!("returned {} results for {given} inputs", reranked.len()),
            });
        }
        Ok(reranked)
    }
}
