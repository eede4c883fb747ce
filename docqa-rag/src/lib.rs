//! # docqa-rag
//!
//! Hybrid retrieval and answer grounding for document question answering.
//!
//! ## Overview
//!
//! A [`QueryEngine`] answers questions over a corpus of [`Chunk`]s:
//!
//! - [`HybridRetriever`] fuses BM25 ([`LexicalIndex`]) and semantic search
//!   (an [`EvidenceStore`]) by weighted, min-max normalized score
//! - [`format_context`] turns the ranked evidence into prompt context
//! - a [`Generator`] writes the answer
//! - [`extract_citations`] recovers `[Source: ..., Page: ..., Section: ...]`
//!   markers and matches them against the evidence
//! - [`estimate_confidence`] scores the answer
//!
//! Storage, embeddings, reranking and generation are traits; bring your own
//! or use [`InMemoryEvidenceStore`] and, with the `openai` feature, the
//! OpenAI-backed collaborators.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{EngineConfig, InMemoryEvidenceStore, QueryEngine, SearchMode};
//! use docqa_rag::openai::{OpenAIEmbeddingProvider, OpenAIGenerator};
//!
//! let embedder = Arc::new(OpenAIEmbeddingProvider::from_env()?);
//! let mut engine = QueryEngine::builder()
//!     .config(EngineConfig::from_env()?)
//!     .evidence_store(Arc::new(InMemoryEvidenceStore::new(embedder)))
//!     .generator(Arc::new(OpenAIGenerator::from_env()?))
//!     .build()?;
//!
//! engine.add_evidence(&chunks).await?;
//! let response = engine.query("What changed in Q3?", SearchMode::Hybrid, true).await?;
//! for citation in &response.citations {
//!     println!("{} p.{:?}: {}", citation.source, citation.page, citation.excerpt);
//! }
//! ```

pub mod citation;
pub mod confidence;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod generator;
pub mod inmemory;
pub mod lexical;
pub mod normalize;
#[cfg(feature = "openai")]
pub mod openai;
pub mod reranker;
pub mod retrieval;
pub mod store;

pub use citation::extract_citations;
pub use confidence::estimate_confidence;
pub use config::{EngineConfig, EngineConfigBuilder};
pub use context::format_context;
pub use document::{
    Chunk, Citation, ConversationTurn, QueryResponse, Role, SearchResult, document_id_for,
};
pub use embedding::EmbeddingProvider;
pub use engine::{NO_RESULTS_ANSWER, QueryEngine, QueryEngineBuilder};
pub use error::{RagError, Result};
pub use generator::{DEFAULT_SYSTEM_INSTRUCTIONS, Generator};
pub use inmemory::InMemoryEvidenceStore;
pub use lexical::{Bm25Params, LexicalIndex};
pub use normalize::normalize_scores;
#[cfg(feature = "openai")]
pub use openai::{OpenAIEmbeddingProvider, OpenAIGenerator};
pub use reranker::{NoOpReranker, Reranker};
pub use retrieval::{HybridRetriever, SearchMode, fuse};
pub use store::{EvidenceStats, EvidenceStore, SearchFilter};
