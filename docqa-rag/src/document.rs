//! Data types for chunks, search results, citations and responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the content digest in a document id.
const DOCUMENT_ID_HEX_LEN: usize = 16;

/// An immutable unit of retrievable text with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub text: String,
    /// File name of the source document, as cited by the model.
    pub source_filename: String,
    /// 1-based page number, when the source is paginated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Section heading the chunk was taken from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Stable id shared by every chunk of one source file. See [`document_id_for`].
    pub document_id: String,
    /// Position of the chunk within its section.
    pub chunk_index: u32,
    /// Opaque extension metadata carried through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Chunk {
    /// Create a chunk with no page, section or extension metadata.
    pub fn new(
        text: impl Into<String>,
        source_filename: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_filename: source_filename.into(),
            page: None,
            section: None,
            document_id: document_id.into(),
            chunk_index: 0,
            extra: BTreeMap::new(),
        }
    }

    /// Set the page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the section heading.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Set the position of the chunk within its section.
    pub fn with_chunk_index(mut self, index: u32) -> Self {
        self.chunk_index = index;
        self
    }
}

/// Compute the document id for a source file from its raw content.
///
/// Re-uploading unchanged content always yields the same id.
pub fn document_id_for(content: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    let digest = format!("{:x}", hasher.finalize());
    digest.chars().take(DOCUMENT_ID_HEX_LEN).collect()
}

/// A retrieved [`Chunk`] paired with a relevance score.
///
/// Scores are only comparable between results produced by the same ranker
/// until they have been normalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The relevance score (higher is more relevant).
    pub score: f32,
}

/// A source reference recovered from a generated answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    /// Cited file name.
    pub source: String,
    /// Cited page, if the marker named one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Cited section, if the marker named one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Preview of the matching evidence chunk; empty when nothing matched.
    pub excerpt: String,
}

/// The answer to one question together with its grounding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    /// Generated answer text.
    pub answer: String,
    /// Citations in order of appearance in `answer`.
    pub citations: Vec<Citation>,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// The deduplicated chunks that were shown to the generator.
    pub evidence: Vec<Chunk>,
}

/// Who produced a conversation entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the bounded conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}
