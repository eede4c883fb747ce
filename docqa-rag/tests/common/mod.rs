//! Deterministic collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docqa_rag::document::{Chunk, ConversationTurn, SearchResult};
use docqa_rag::embedding::EmbeddingProvider;
use docqa_rag::error::{RagError, Result};
use docqa_rag::generator::Generator;
use docqa_rag::store::{EvidenceStats, EvidenceStore, SearchFilter};

pub const DIM: usize = 64;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0xcbf2_9ce4_8422_2325, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3))
}

/// Bag-of-words embedder: each normalized token increments one hashed bucket.
#[derive(Debug, Default)]
pub struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; DIM];
        for token in text.split_whitespace() {
            let token: String =
                token.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect();
            if token.is_empty() {
                continue;
            }
            vector[(fnv1a(token.as_bytes()) % DIM as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Embeds every text to the same vector, so every chunk is a perfect match.
#[derive(Debug, Default)]
pub struct ConstantEmbedder;

#[async_trait]
impl EmbeddingProvider for ConstantEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0; 4])
    }

    fn dimensions(&self) -> usize {
        4
    }
}

/// An evidence store whose every call fails.
#[derive(Debug, Default)]
pub struct FailingStore;

fn store_down() -> RagError {
    RagError::RetrievalError { backend: "Failing".into(), message: "store unavailable".into() }
}

#[async_trait]
impl EvidenceStore for FailingStore {
    async fn similarity_search(
        &self,
        _query: &str,
        _k: usize,
        _filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchResult>> {
        Err(store_down())
    }

    async fn list_all(&self) -> Result<Vec<Chunk>> {
        Err(store_down())
    }

    async fn add(&self, _chunks: &[Chunk]) -> Result<Vec<String>> {
        Err(store_down())
    }

    async fn delete_by_document(&self, _document_id: &str) -> Result<usize> {
        Err(store_down())
    }

    async fn stats(&self) -> Result<EvidenceStats> {
        Err(store_down())
    }
}

/// Arguments of one [`Generator::generate`] call.
#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub system_instructions: String,
    pub context: String,
    pub question: String,
    pub history: Vec<ConversationTurn>,
}

/// Replies with a fixed answer (or `answer {n}` per call) and records every call.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    answer: Option<String>,
    calls: Mutex<Vec<GenerateCall>>,
}

impl ScriptedGenerator {
    /// Always answer with `answer`.
    pub fn answering(answer: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { answer: Some(answer.into()), calls: Mutex::new(Vec::new()) })
    }

    /// Answer the n-th call (from 1) with `answer n`.
    pub fn counting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<GenerateCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        system_instructions: &str,
        context: &str,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(GenerateCall {
            system_instructions: system_instructions.to_string(),
            context: context.to_string(),
            question: question.to_string(),
            history: history.to_vec(),
        });
        Ok(match &self.answer {
            Some(answer) => answer.clone(),
            None => format!("answer {}", calls.len()),
        })
    }
}

/// A generator whose every call fails with a non-generation error.
#[derive(Debug, Default)]
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(
        &self,
        _system_instructions: &str,
        _context: &str,
        _question: &str,
        _history: &[ConversationTurn],
    ) -> Result<String> {
        Err(RagError::InputError("model rejected the prompt".into()))
    }
}

pub fn chunk(text: &str, filename: &str, document_id: &str) -> Chunk {
    Chunk::new(text, filename, document_id)
}
