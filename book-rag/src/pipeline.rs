//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates book ingestion (chunk → embed → store, in
//! batches) and question answering (ground → prompt → complete) by composing
//! an [`EmbeddingProvider`], a [`VectorStore`], a [`CompletionModel`] and a
//! [`Chunker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use book_rag::{AskRequest, RagConfig, RagPipeline, SentenceChunker};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(store))
//!     .completion_model(Arc::new(chat))
//!     .chunker(Arc::new(SentenceChunker::new(600)))
//!     .build()?;
//!
//! pipeline.ingest(&documents).await?;
//! let answer = pipeline.ask(&AskRequest::new("What is a chunk?")).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::chunking::Chunker;
use crate::completion::CompletionModel;
use crate::composer::{
    NO_RELEVANT_INFO_ANSWER, Retriever, answer_context, compose_prompt, format_sources,
};
use crate::config::RagConfig;
use crate::document::{AnswerResult, AskRequest, Chunk, Document, RetrievedItem, StoredChunk};
use crate::embedding::{EmbeddingProvider, InputType};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Number of question characters echoed into the logs.
const QUESTION_LOG_CHARS: usize = 50;

/// The RAG pipeline orchestrator.
///
/// Holds no per-query state, so one instance can serve concurrent requests
/// behind an `Arc`. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    completion_model: Arc<dyn CompletionModel>,
    chunker: Arc<dyn Chunker>,
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("config", &self.config)
            .field("completion_model", &self.completion_model.name())
            .finish_non_exhaustive()
    }
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Create the configured collection if it does not exist yet.
    ///
    /// The collection is created with the dimensionality reported by the
    /// configured [`EmbeddingProvider`].
    ///
    /// # Errors
    ///
    /// Returns the vector store error if creation fails.
    pub async fn create_collection(&self) -> Result<()> {
        let collection = self.config.collection.as_str();
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(collection, dimensions).await.inspect_err(|e| {
            error!(collection, error = %e, "failed to create collection");
        })
    }

    /// Split documents into chunks, in document order.
    ///
    /// Chunk indices restart at 0 for every document.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            let document_chunks = self.chunker.chunk(document);
            debug!(source = %document.source, chunk_count = document_chunks.len(), "chunked document");
            chunks.extend(document_chunks);
        }
        info!(chunk_count = chunks.len(), document_count = documents.len(), "chunked documents");
        chunks
    }

    /// Ingest documents: chunk, then embed and store in batches.
    ///
    /// Returns the number of chunks stored.
    ///
    /// # Errors
    ///
    /// See [`store_chunks`](Self::store_chunks).
    pub async fn ingest(&self, documents: &[Document]) -> Result<usize> {
        let chunks = self.chunk_documents(documents);
        self.store_chunks(&chunks).await
    }

    /// Embed and upsert chunks in batches of `batch_size`.
    ///
    /// Each batch is one embedding call plus one upsert call. Point ids are the
    /// chunk's position in `chunks`, so re-ingesting the same book overwrites
    /// the previous points. The collection is created first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] naming the first batch that fails.
    /// Batches before it stay stored and no further batches are attempted.
    pub async fn store_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            warn!("no chunks found to index");
            return Ok(0);
        }

        self.create_collection().await?;

        let batch_size = self.config.batch_size.max(1);
        for (batch_index, batch) in chunks.chunks(batch_size).enumerate() {
            let batch_number = batch_index + 1;
            let offset = batch_index * batch_size;
            self.store_batch(offset, batch).await.map_err(|e| {
                error!(batch = batch_number, error = %e, "failed to embed and store batch");
                RagError::PipelineError(format!("batch {batch_number} failed: {e}"))
            })?;
            info!(batch = batch_number, count = batch.len(), "uploaded batch");
        }

        info!(chunk_count = chunks.len(), collection = %self.config.collection, "ingestion complete");
        Ok(chunks.len())
    }

    async fn store_batch(&self, offset: usize, batch: &[Chunk]) -> Result<()> {
        let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts, InputType::Document).await?;
        if embeddings.len() != batch.len() {
            return Err(RagError::PipelineError(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }

        let points: Vec<StoredChunk> = batch
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk, embedding))| StoredChunk {
                id: (offset + i) as u64,
                chunk: chunk.clone(),
                embedding,
            })
            .collect();

        self.vector_store.upsert(&self.config.collection, &points).await
    }

    /// Embed the question and return the `top_k` most similar chunks.
    ///
    /// # Errors
    ///
    /// Returns the embedding or vector store error. An empty index is not an
    /// error and yields an empty `Vec`.
    pub async fn search(&self, question: &str, top_k: usize) -> Result<Vec<RetrievedItem>> {
        let query_embedding =
            self.embedding_provider.embed(question, InputType::Query).await.inspect_err(|e| {
                error!(error = %e, "embedding failed during search");
            })?;

        let collection = self.config.collection.as_str();
        let items = self
            .vector_store
            .search(collection, &query_embedding, top_k)
            .await
            .inspect_err(|e| error!(collection, error = %e, "vector store search failed"))?;

        debug!(result_count = items.len(), top_k, "search completed");
        Ok(items)
    }

    /// Answer a question.
    ///
    /// Grounds the answer on the selected text when given, otherwise on the
    /// retrieved chunks. When retrieval finds nothing the fixed
    /// "couldn't find relevant information" answer is returned and the
    /// completion model is not called.
    ///
    /// # Errors
    ///
    /// Returns the first upstream error (embedding, search or completion).
    pub async fn ask(&self, request: &AskRequest) -> Result<AnswerResult> {
        let preview: String = request.question.chars().take(QUESTION_LOG_CHARS).collect();
        info!(question = %preview, top_k = request.top_k, "received question");

        let context = answer_context(
            self,
            &request.question,
            request.selected_text.as_deref(),
            request.top_k,
        )
        .await?;

        if context.is_empty() {
            warn!("no relevant content found in vector store");
            return Ok(AnswerResult {
                answer: NO_RELEVANT_INFO_ANSWER.to_string(),
                sources: Vec::new(),
                selected_text_used: false,
            });
        }

        let prompt = compose_prompt(&request.question, &context);
        info!(
            model = self.completion_model.name(),
            passages = context.items.len(),
            selected_text_used = context.selected_text_used,
            "sending prompt to completion model"
        );
        let answer = self.completion_model.complete(&prompt).await.inspect_err(|e| {
            error!(model = self.completion_model.name(), error = %e, "completion failed");
        })?;

        info!("generated answer");
        Ok(AnswerResult {
            answer,
            sources: format_sources(&context.items, self.config.snippet_chars),
            selected_text_used: context.selected_text_used,
        })
    }
}

#[async_trait]
impl Retriever for RagPipeline {
    async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<RetrievedItem>> {
        self.search(question, top_k).await
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The configuration, embedding provider, vector store and completion model
/// are required. The chunker defaults to a
/// [`SentenceChunker`](crate::SentenceChunker) using the configured
/// `max_words`.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    completion_model: Option<Arc<dyn CompletionModel>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the model that writes answers.
    pub fn completion_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.completion_model = Some(model);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let completion_model = self
            .completion_model
            .ok_or_else(|| RagError::ConfigError("completion_model is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(crate::chunking::SentenceChunker::new(config.max_words))
        });

        Ok(RagPipeline { config, embedding_provider, vector_store, completion_model, chunker })
    }
}
