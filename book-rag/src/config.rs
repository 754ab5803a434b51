//! Configuration for the RAG pipeline and its hosted providers.

use serde::{Deserialize, Serialize};

use crate::document::DEFAULT_TOP_K;
use crate::error::{RagError, Result};

/// Name of the collection book chunks are stored in.
pub const DEFAULT_COLLECTION: &str = "book_content";

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Target maximum number of words per chunk.
    pub max_words: usize,
    /// Default number of chunks retrieved per question.
    pub top_k: usize,
    /// Number of chunks embedded and upserted per ingestion call.
    pub batch_size: usize,
    /// Vector store collection holding the book chunks.
    pub collection: String,
    /// Number of characters of each source shown in an answer.
    pub snippet_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_words: 600,
            top_k: DEFAULT_TOP_K,
            batch_size: 10,
            collection: DEFAULT_COLLECTION.to_string(),
            snippet_chars: 200,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the target maximum number of words per chunk.
    pub fn max_words(mut self, max_words: usize) -> Self {
        self.config.max_words = max_words;
        self
    }

    /// Set the default number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the number of chunks per ingestion batch.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the vector store collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the display length of answer sources, in characters.
    pub fn snippet_chars(mut self, chars: usize) -> Self {
        self.config.snippet_chars = chars;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `max_words`, `top_k`,
    /// `batch_size` or `snippet_chars` is zero, or the collection name is blank.
    pub fn build(self) -> Result<RagConfig> {
        let checks = [
            ("max_words", self.config.max_words),
            ("top_k", self.config.top_k),
            ("batch_size", self.config.batch_size),
            ("snippet_chars", self.config.snippet_chars),
        ];
        if let Some((name, _)) = checks.iter().find(|(_, value)| *value == 0) {
            return Err(RagError::ConfigError(format!("{name} must be greater than zero")));
        }
        if self.config.collection.trim().is_empty() {
            return Err(RagError::ConfigError("collection name must not be empty".to_string()));
        }
        Ok(self.config)
    }
}

/// Sampling parameters for the answer-generating model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionConfig {
    /// Chat model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Cap on generated tokens.
    pub max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self { model: "command-r-08-2024".to_string(), temperature: 0.3, max_tokens: 500 }
    }
}

/// Embedding model selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// Embedding model name.
    pub model: String,
    /// Dimensionality of the vectors the model returns.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { model: "embed-english-v3.0".to_string(), dimensions: 1024 }
    }
}

/// Endpoints and credentials for the hosted services, read from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// API key for the embedding and chat provider (`COHERE_API_KEY`).
    pub cohere_api_key: String,
    /// Vector database URL (`QDRANT_URL`).
    pub qdrant_url: String,
    /// Optional vector database API key (`QDRANT_API_KEY`).
    pub qdrant_api_key: Option<String>,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_api_key", &self.qdrant_api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl ProviderSettings {
    /// Read settings from `COHERE_API_KEY`, `QDRANT_URL` and `QDRANT_API_KEY`.
    ///
    /// `QDRANT_URL` defaults to `http://localhost:6334`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `COHERE_API_KEY` is unset or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let cohere_api_key = lookup("COHERE_API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RagError::ConfigError("COHERE_API_KEY is not set".to_string()))?;
        let qdrant_url =
            lookup("QDRANT_URL").unwrap_or_else(|| "http://localhost:6334".to_string());
        let qdrant_api_key = lookup("QDRANT_API_KEY").filter(|key| !key.is_empty());
        Ok(Self { cohere_api_key, qdrant_url, qdrant_api_key })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_book_ingestion() {
        let config = RagConfig::default();
        assert_eq!(config.max_words, 600);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.collection, "book_content");
        assert_eq!(config.snippet_chars, 200);
    }

    #[test]
    fn builder_rejects_zero_values() {
        assert!(RagConfig::builder().max_words(0).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().batch_size(0).build().is_err());
        assert!(RagConfig::builder().snippet_chars(0).build().is_err());
        assert!(RagConfig::builder().collection("  ").build().is_err());
    }

    #[test]
    fn builder_applies_overrides() {
        let config = RagConfig::builder().max_words(50).batch_size(3).collection("notes").build();
        let config = config.unwrap();
        assert_eq!(config.max_words, 50);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.collection, "notes");
    }

    #[test]
    fn provider_settings_require_api_key() {
        let vars: HashMap<&str, &str> = HashMap::from([("QDRANT_URL", "http://qdrant:6334")]);
        let err = ProviderSettings::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert!(matches!(err, Err(RagError::ConfigError(_))));
    }

    #[test]
    fn provider_settings_default_qdrant_url() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("COHERE_API_KEY", "secret-value"), ("QDRANT_API_KEY", "")]);
        let settings = ProviderSettings::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        let settings = settings.unwrap();
        assert_eq!(settings.qdrant_url, "http://localhost:6334");
        assert_eq!(settings.qdrant_api_key, None);
        assert!(!format!("{settings:?}").contains("secret-value"));
    }
}
