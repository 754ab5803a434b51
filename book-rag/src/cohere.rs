//! Cohere embedding and chat providers using the Cohere REST API.
//!
//! This module is only available when the `cohere` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::completion::CompletionModel;
use crate::config::{CompletionConfig, EmbeddingConfig};
use crate::embedding::{EmbeddingProvider, InputType};
use crate::error::{RagError, Result};

/// The default Cohere API base URL.
pub const COHERE_API_BASE: &str = "https://api.cohere.com";

/// Per-request timeout applied to every Cohere call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest number of texts Cohere accepts in one embed call.
const MAX_TEXTS_PER_CALL: usize = 96;

const PROVIDER: &str = "Cohere";

// ── Shared HTTP plumbing ───────────────────────────────────────────

#[derive(Clone)]
struct CohereHttp {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl CohereHttp {
    fn new(api_key: String, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(RagError::ConfigError("Cohere API key must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, api_key, base_url: COHERE_API_BASE.to_string() })
    }

    /// POST `body` to `path` and decode the JSON reply.
    ///
    /// `wrap` turns a failure description into the caller's error variant.
    async fn post<B, T>(&self, path: &str, body: &B, wrap: fn(String) -> RagError) -> Result<T>
    where
        B: Serialize + Sync,
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{path}", self.base_url.trim_end_matches('/'));
        let response =
            self.client.post(&url).bearer_auth(&self.api_key).json(body).send().await.map_err(
                |e| {
                    error!(provider = PROVIDER, path, error = %e, "request failed");
                    wrap(format!("request failed: {e}"))
                },
            )?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.message).unwrap_or(body);

            error!(provider = PROVIDER, path, %status, "API error");
            return Err(wrap(format!("API returned {status}: {detail}")));
        }

        response.json().await.map_err(|e| {
            error!(provider = PROVIDER, path, error = %e, "failed to parse response");
            wrap(format!("failed to parse response: {e}"))
        })
    }
}

fn embedding_error(message: String) -> RagError {
    RagError::EmbeddingError { provider: PROVIDER.into(), message }
}

fn completion_error(message: String) -> RagError {
    RagError::CompletionError { provider: PROVIDER.into(), message }
}

// ── Cohere API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [&'a str],
    model: &'a str,
    input_type: &'static str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

fn cohere_input_type(input_type: InputType) -> &'static str {
    match input_type {
        InputType::Document => "search_document",
        InputType::Query => "search_query",
    }
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the Cohere `/v1/embed` endpoint.
///
/// Defaults to `embed-english-v3.0` (1024 dimensions).
///
/// # Example
///
/// ```rust,ignore
/// use book_rag::cohere::CohereEmbeddingProvider;
///
/// let provider = CohereEmbeddingProvider::new(settings.cohere_api_key.clone())?;
/// let embedding = provider.embed("hello world", InputType::Query).await?;
/// ```
pub struct CohereEmbeddingProvider {
    http: CohereHttp,
    config: EmbeddingConfig,
}

impl CohereEmbeddingProvider {
    /// Create a new provider with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: CohereHttp::new(api_key.into(), DEFAULT_TIMEOUT)?,
            config: EmbeddingConfig::default(),
        })
    }

    /// Use a different embedding model.
    pub fn with_config(mut self, config: EmbeddingConfig) -> Self {
        self.config = config;
        self
    }

    /// Point the provider at a different API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for CohereEmbeddingProvider {
    async fn embed(&self, text: &str, input_type: InputType) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text], input_type).await?;
        results.into_iter().next().ok_or_else(|| embedding_error("API returned no embeddings".into()))
    }

    async fn embed_batch(&self, texts: &[&str], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for group in texts.chunks(MAX_TEXTS_PER_CALL) {
            debug!(
                provider = PROVIDER,
                batch_size = group.len(),
                model = %self.config.model,
                ?input_type,
                "embedding batch"
            );

            let request = EmbedRequest {
                texts: group,
                model: &self.config.model,
                input_type: cohere_input_type(input_type),
            };
            let response: EmbedResponse =
                self.http.post("/v1/embed", &request, embedding_error).await?;

            if response.embeddings.len() != group.len() {
                return Err(embedding_error(format!(
                    "expected {} embeddings, got {}",
                    group.len(),
                    response.embeddings.len()
                )));
            }
            embeddings.extend(response.embeddings);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}

// ── Chat completion ────────────────────────────────────────────────

/// A [`CompletionModel`] backed by the Cohere `/v1/chat` endpoint.
///
/// Defaults to `command-r-08-2024` with temperature 0.3 and 500 output tokens.
pub struct CohereChatModel {
    http: CohereHttp,
    config: CompletionConfig,
}

impl CohereChatModel {
    /// Create a new chat model with the given API key and default sampling.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: CohereHttp::new(api_key.into(), DEFAULT_TIMEOUT)?,
            config: CompletionConfig::default(),
        })
    }

    /// Override model and sampling parameters.
    pub fn with_config(mut self, config: CompletionConfig) -> Self {
        self.config = config;
        self
    }

    /// Point the model at a different API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CompletionModel for CohereChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.config.model, prompt_len = prompt.len(), "chat request");

        let request = ChatRequest {
            message: prompt,
            model: &self.config.model,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let response: ChatResponse = self.http.post("/v1/chat", &request, completion_error).await?;
        Ok(response.text)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}
