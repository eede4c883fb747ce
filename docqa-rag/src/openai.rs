//! OpenAI embedding provider and chat-completions generator.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::{ConversationTurn, Role};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generator::Generator;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// The default model for OpenAI embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// The default chat model used to answer questions.
const DEFAULT_CHAT_MODEL: &str = "gpt-4-turbo-preview";

/// Low temperature keeps answers close to the context.
const DEFAULT_TEMPERATURE: f32 = 0.1;

fn api_key_from_env() -> Option<String> {
    std::env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty())
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// Uses `reqwest` to call the `/v1/embeddings` endpoint directly.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`, or `EMBEDDING_MODEL`
///   when built with [`from_env`](Self::from_env).
/// - `dimensions` – optional Matryoshka dimension override.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key.
    ///
    /// Uses the default model (`text-embedding-3-small`) and dimensions (1536).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: "OpenAI".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Create a new provider from `OPENAI_API_KEY`, honoring `EMBEDDING_MODEL`.
    pub fn from_env() -> Result<Self> {
        let api_key = api_key_from_env().ok_or_else(|| RagError::EmbeddingError {
            provider: "OpenAI".into(),
            message: "OPENAI_API_KEY environment variable not set".into(),
        })?;
        let provider = Self::new(api_key)?;
        Ok(match std::env::var("EMBEDDING_MODEL") {
            Ok(model) if !model.trim().is_empty() => provider.with_model(model.trim()),
            _ => provider,
        })
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    ///
    /// When set, the API returns embeddings truncated to this size.
    /// This also updates the value returned by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }
}

/// A [`Generator`] backed by the OpenAI chat completions API.
///
/// Sends the system instructions, the prior conversation turns and a user
/// message carrying the formatted context and the question.
///
/// # Configuration
///
/// - `model` – defaults to `gpt-4-turbo-preview` (`LLM_MODEL` via [`from_env`](Self::from_env)).
/// - `temperature` – defaults to `0.1` (`TEMPERATURE` via [`from_env`](Self::from_env)).
pub struct OpenAIGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAIGenerator {
    /// Create a new generator with the given API key and default settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(generation_error("API key must not be empty"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Create a new generator from `OPENAI_API_KEY`, honoring `LLM_MODEL` and
    /// `TEMPERATURE`.
    ///
    /// # Errors
    ///
    /// Fails when the key is missing or `TEMPERATURE` is not a number.
    pub fn from_env() -> Result<Self> {
        let api_key = api_key_from_env()
            .ok_or_else(|| generation_error("OPENAI_API_KEY environment variable not set"))?;
        let mut generator = Self::new(api_key)?;
        if let Ok(model) = std::env::var("LLM_MODEL") {
            if !model.trim().is_empty() {
                generator.model = model.trim().to_string();
            }
        }
        if let Ok(raw) = std::env::var("TEMPERATURE") {
            generator.temperature = raw.trim().parse().map_err(|_| {
                RagError::ConfigError(format!("TEMPERATURE must be a number, got '{raw}'"))
            })?;
        }
        Ok(generator)
    }

    /// Set the chat model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

fn generation_error(message: impl Into<String>) -> RagError {
    RagError::GenerationError { provider: "OpenAI".into(), message: message.into() }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: std::borrow::Cow<'a, str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Post `body` to `url`, mapping transport and HTTP failures through `to_error`.
async fn post_json<B, R>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
    to_error: fn(String) -> RagError,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: for<'de> Deserialize<'de>,
{
    let response = client.post(url).bearer_auth(api_key).json(body).send().await.map_err(|e| {
        error!(provider = "OpenAI", error = %e, "request failed");
        to_error(format!("request failed: {e}"))
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

        error!(provider = "OpenAI", %status, "API error");
        return Err(to_error(format!("API returned {status}: {detail}")));
    }

    response.json().await.map_err(|e| {
        error!(provider = "OpenAI", error = %e, "failed to parse response");
        to_error(format!("failed to parse response: {e}"))
    })
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "OpenAI", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: "OpenAI".into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "OpenAI",
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };
        let response: EmbeddingResponse = post_json(
            &self.client,
            OPENAI_EMBEDDINGS_URL,
            &self.api_key,
            &request_body,
            |message| RagError::EmbeddingError { provider: "OpenAI".into(), message },
        )
        .await?;

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Generator implementation ───────────────────────────────────────

#[async_trait]
impl Generator for OpenAIGenerator {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn generate(
        &self,
        system_instructions: &str,
        context: &str,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<String> {
        debug!(
            provider = "OpenAI",
            model = %self.model,
            history_len = history.len(),
            context_len = context.len(),
            "generating answer"
        );

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage { role: "system", content: system_instructions.into() });
        messages.extend(history.iter().map(|turn| ChatMessage {
            role: match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: turn.content.as_str().into(),
        }));
        messages.push(ChatMessage {
            role: "user",
            content: format!(
                "Context from documents:\n{context}\n\nQuestion: {question}\n\n\
                 Provide a detailed answer with proper citations."
            )
            .into(),
        });

        let request_body =
            ChatRequest { model: &self.model, messages, temperature: self.temperature };
        let response: ChatResponse = post_json(
            &self.client,
            OPENAI_CHAT_URL,
            &self.api_key,
            &request_body,
            |message| RagError::GenerationError { provider: "OpenAI".into(), message },
        )
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| generation_error("API returned no answer"))
    }
}
