//! BM25 keyword index over the full chunk set.
//!
//! Documents and queries are tokenized by lower-casing and splitting on
//! whitespace. There is no stemming and no stop-word list, so `"Cells"` and
//! `"cell"` are different terms and punctuation stays attached to words.
//!
//! # Algorithm
//!
//! Okapi BM25 scores a chunk `d` for query terms `q1..qn` as
//!
//! ```text
//! score(d) = Σ idf(qi) · tf(qi, d) · (k1 + 1) / (tf(qi, d) + k1 · (1 - b + b · |d| / avgdl))
//! idf(q)   = ln(1 + (N - n(q) + 0.5) / (n(q) + 0.5))
//! ```
//!
//! The IDF form never goes negative, so any shared term yields a positive score
//! even when it occurs in every chunk.
//!
//! The index is immutable once built. Any change to the corpus requires a full
//! [`LexicalIndex::build`]; callers swap the new index in place of the old one.

use std::collections::HashMap;

use tracing::instrument;

use crate::document::{Chunk, SearchResult};

/// BM25 tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f32,
    /// Document-length normalization strength.
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Split text into lower-cased whitespace-separated terms.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Immutable BM25 index over a snapshot of the corpus.
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    chunks: Vec<Chunk>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f32,
    idf: HashMap<String, f32>,
    params: Bm25Params,
}

impl LexicalIndex {
    /// An index with no documents. Every search returns nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index over `chunks`, preserving their order for tie-breaking.
    #[instrument(skip_all, fields(chunk_count = chunks.len()))]
    pub fn build(chunks: Vec<Chunk>, params: Bm25Params) -> Self {
        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut doc_lens = Vec::with_capacity(chunks.len());
        let mut doc_freqs: HashMap<String, u32> = HashMap::new();

        for chunk in &chunks {
            let tokens = tokenize(&chunk.text);
            doc_lens.push(tokens.len());

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
        }

        let n = chunks.len() as f32;
        let avg_doc_len = if chunks.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f32 / n
        };
        let idf = doc_freqs
            .into_iter()
            .map(|(term, df)| {
                let df = df as f32;
                (term, (1.0 + (n - df + 0.5) / (df + 0.5)).ln())
            })
            .collect();

        Self { chunks, term_freqs, doc_lens, avg_doc_len, idf, params }
    }

    /// Rank chunks against `query`.
    ///
    /// Returns up to `k` results with a score above zero, highest first; equal
    /// scores keep corpus order. An empty index or query returns nothing.
    pub fn search(&self, query: &str, k: usize) -> Vec<SearchResult> {
        if self.chunks.is_empty() || k == 0 {
            return Vec::new();
        }
        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = (0..self.chunks.len())
            .map(|idx| (idx, self.score(idx, &terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(idx, score)| SearchResult { chunk: self.chunks[idx].clone(), score })
            .collect()
    }

    fn score(&self, idx: usize, terms: &[String]) -> f32 {
        let Bm25Params { k1, b } = self.params;
        let freqs = &self.term_freqs[idx];
        let len_ratio =
            if self.avg_doc_len > 0.0 { self.doc_lens[idx] as f32 / self.avg_doc_len } else { 0.0 };
        let norm = k1 * (1.0 - b + b * len_ratio);

        terms
            .iter()
            .map(|term| {
                let tf = freqs.get(term).copied().unwrap_or(0) as f32;
                if tf == 0.0 {
                    return 0.0;
                }
                let idf = self.idf.get(term).copied().unwrap_or(0.0);
                idf * tf * (k1 + 1.0) / (tf + norm)
            })
            .sum()
    }

    /// Returns the number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if no chunks have been indexed.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Chunk {
        Chunk::new(text, "notes.txt", "doc")
    }

    fn index(texts: &[&str]) -> LexicalIndex {
        LexicalIndex::build(texts.iter().map(|t| chunk(t)).collect(), Bm25Params::default())
    }

    #[test]
    fn tokenizes_by_whitespace_without_stemming() {
        assert_eq!(tokenize("  Rust\tCELLS cell,  "), vec!["rust", "cells", "cell,"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn ranks_matching_chunks_by_score() {
        let index = index(&[
            "the quick brown fox jumps over the lazy dog",
            "the lazy cat sleeps all day",
            "quick brown rabbits hop in the garden quick",
        ]);

        let results = index.search("quick brown", 10);
        assert_eq!(results.len(), 2);
        assert!(results[0].chunk.text.starts_with("quick brown rabbits"));
        assert!(results[0].score >= results[1].score);
        assert!(results.iter().all(|r| r.score > 0.0));
    }

    #[test]
    fn query_is_case_insensitive() {
        let index = index(&["Mitochondria produce energy", "ribosomes build proteins"]);
        let results = index.search("MITOCHONDRIA", 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "Mitochondria produce energy");
    }

    #[test]
    fn equal_scores_keep_corpus_order() {
        let index = index(&["alpha beta", "gamma delta", "alpha beta"]);
        let results = index.search("alpha", 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].score, results[1].score);

        let rebuilt = LexicalIndex::build(
            vec![chunk("alpha beta").with_chunk_index(0), chunk("alpha beta").with_chunk_index(1)],
            Bm25Params::default(),
        );
        let results = rebuilt.search("alpha", 5);
        assert_eq!(results[0].chunk.chunk_index, 0);
        assert_eq!(results[1].chunk.chunk_index, 1);
    }

    #[test]
    fn truncates_to_k() {
        let index = index(&["a b", "a c", "a d", "a e"]);
        assert_eq!(index.search("a", 2).len(), 2);
        assert!(index.search("a", 0).is_empty());
    }

    #[test]
    fn term_in_every_chunk_still_scores_positive() {
        let index = index(&["The mitochondria is the powerhouse of the cell."]);
        let results = index.search("What is the mitochondria?", 3);
        assert_eq!(results.len(), 1);
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn empty_index_and_empty_query_return_nothing() {
        assert!(LexicalIndex::empty().search("anything", 10).is_empty());
        assert!(index(&[]).search("anything", 10).is_empty());
        assert!(index(&["some text"]).search("   ", 10).is_empty());
        assert!(index(&["some text"]).search("absent", 10).is_empty());
    }
}
