//! Configuration for retrieval, fusion and the query engine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the query engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Number of chunks handed to the generator per query.
    pub top_k: usize,
    /// Minimum semantic similarity for a result to be kept.
    ///
    /// Applies to vector and hybrid retrieval only; keyword results are never
    /// filtered by it.
    pub similarity_threshold: f32,
    /// Weight of the semantic ranking in hybrid fusion (`1 - alpha` goes to BM25).
    pub hybrid_alpha: f32,
    /// Each ranker is asked for `overfetch_factor * top_k` candidates before fusion.
    pub overfetch_factor: usize,
    /// BM25 term-frequency saturation.
    pub bm25_k1: f32,
    /// BM25 document-length normalization.
    pub bm25_b: f32,
    /// Maximum number of history entries kept (two per question/answer turn).
    pub history_limit: usize,
    /// Whether question/answer turns are recorded at all.
    pub memory_enabled: bool,
    /// Maximum characters of chunk text copied into a citation excerpt.
    pub excerpt_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.7,
            hybrid_alpha: 0.5,
            overfetch_factor: 2,
            bm25_k1: 1.5,
            bm25_b: 0.75,
            history_limit: 10,
            memory_enabled: true,
            excerpt_chars: 200,
        }
    }
}

impl EngineConfig {
    /// Create a new builder for constructing an [`EngineConfig`].
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Build a configuration from the process environment.
    ///
    /// Reads `TOP_K_RESULTS`, `SIMILARITY_THRESHOLD`, `HYBRID_ALPHA` and
    /// `ENABLE_CONVERSATION_MEMORY`; unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a variable cannot be parsed or the
    /// resulting configuration is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(top_k) = parse_var::<usize, _>(&lookup, "TOP_K_RESULTS")? {
            builder = builder.top_k(top_k);
        }
        if let Some(threshold) = parse_var::<f32, _>(&lookup, "SIMILARITY_THRESHOLD")? {
            builder = builder.similarity_threshold(threshold);
        }
        if let Some(alpha) = parse_var::<f32, _>(&lookup, "HYBRID_ALPHA")? {
            builder = builder.hybrid_alpha(alpha);
        }
        if let Some(memory) = lookup("ENABLE_CONVERSATION_MEMORY") {
            builder = builder.memory_enabled(memory.trim().eq_ignore_ascii_case("true"));
        }
        builder.build()
    }

    /// Number of candidates requested from each ranker before fusion.
    pub fn candidate_count(&self, k: usize) -> usize {
        k.saturating_mul(self.overfetch_factor)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| RagError::ConfigError(format!("{key} has an invalid value: '{raw}'"))),
    }
}

/// Builder for constructing a validated [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the number of chunks handed to the generator.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum semantic similarity.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the semantic weight used by hybrid fusion.
    pub fn hybrid_alpha(mut self, alpha: f32) -> Self {
        self.config.hybrid_alpha = alpha;
        self
    }

    /// Set the candidate over-fetch multiplier.
    pub fn overfetch_factor(mut self, factor: usize) -> Self {
        self.config.overfetch_factor = factor;
        self
    }

    /// Set the BM25 `k1` and `b` parameters.
    pub fn bm25_params(mut self, k1: f32, b: f32) -> Self {
        self.config.bm25_k1 = k1;
        self.config.bm25_b = b;
        self
    }

    /// Set the number of history entries retained.
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }

    /// Enable or disable conversation memory.
    pub fn memory_enabled(mut self, enabled: bool) -> Self {
        self.config.memory_enabled = enabled;
        self
    }

    /// Set the maximum excerpt length in characters.
    pub fn excerpt_chars(mut self, chars: usize) -> Self {
        self.config.excerpt_chars = chars;
        self
    }

    /// Build the [`EngineConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k`, `overfetch_factor` or `excerpt_chars` is zero
    /// - `hybrid_alpha` or `bm25_b` is outside `[0, 1]`
    /// - `bm25_k1` is negative or any float is not finite
    /// - `history_limit` is zero or odd
    pub fn build(self) -> Result<EngineConfig> {
        let c = &self.config;
        if c.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if c.overfetch_factor == 0 {
            return Err(RagError::ConfigError(
                "overfetch_factor must be greater than zero".to_string(),
            ));
        }
        if c.excerpt_chars == 0 {
            return Err(RagError::ConfigError("excerpt_chars must be greater than zero".to_string()));
        }
        if !c.similarity_threshold.is_finite() {
            return Err(RagError::ConfigError("similarity_threshold must be finite".to_string()));
        }
        if !(0.0..=1.0).contains(&c.hybrid_alpha) {
            return Err(RagError::ConfigError(format!(
                "hybrid_alpha ({}) must be within [0, 1]",
                c.hybrid_alpha
            )));
        }
        if !c.bm25_k1.is_finite() || c.bm25_k1 < 0.0 {
            return Err(RagError::ConfigError(format!(
                "bm25_k1 ({}) must be a non-negative number",
                c.bm25_k1
            )));
        }
        if !(0.0..=1.0).contains(&c.bm25_b) {
            return Err(RagError::ConfigError(format!("bm25_b ({}) must be within [0, 1]", c.bm25_b)));
        }
        if c.history_limit == 0 || c.history_limit % 2 != 0 {
            return Err(RagError::ConfigError(format!(
                "history_limit ({}) must be a positive even number",
                c.history_limit
            )));
        }
        Ok(self.config)
    }
}
