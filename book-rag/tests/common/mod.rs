//! Hand-written fakes for the pipeline's external collaborators.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use book_rag::{
    CompletionModel, EmbeddingProvider, InputType, RagConfig, RagError, RagPipeline,
    RetrievedItem, StoredChunk, VectorStore,
};

/// Deterministic hash-based embeddings that record every call.
#[derive(Default)]
pub struct HashEmbedder {
    pub calls: Mutex<Vec<(usize, InputType)>>,
    pub fail: bool,
}

impl HashEmbedder {
    pub const DIMENSIONS: usize = 8;

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn call_log(&self) -> Vec<(usize, InputType)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str, input_type: InputType) -> book_rag::Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text], input_type).await?;
        Ok(batch.remove(0))
    }

    async fn embed_batch(
        &self,
        texts: &[&str],
        input_type: InputType,
    ) -> book_rag::Result<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().push((texts.len(), input_type));
        if self.fail {
            return Err(RagError::EmbeddingError {
                provider: "fake".into(),
                message: "embedding service unavailable".into(),
            });
        }
        Ok(texts
            .iter()
            .map(|text| {
                let hash = text
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
                (0..Self::DIMENSIONS)
                    .map(|i| ((hash.wrapping_add(i as u64)) as f32).sin())
                    .collect()
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }
}

/// A store that records upserts and answers searches from a canned list.
#[derive(Default)]
pub struct RecordingStore {
    pub created: Mutex<Vec<(String, usize)>>,
    pub upserts: Mutex<Vec<Vec<StoredChunk>>>,
    pub searches: AtomicUsize,
    pub results: Vec<RetrievedItem>,
    /// Fail the upsert with this 1-based call number.
    pub fail_on_upsert: Option<usize>,
    pub fail_search: bool,
}

impl RecordingStore {
    pub fn with_results(results: Vec<RetrievedItem>) -> Self {
        Self { results, ..Self::default() }
    }

    pub fn upserted_ids(&self) -> Vec<Vec<u64>> {
        self.upserts
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch.iter().map(|p| p.id).collect())
            .collect()
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> book_rag::Result<()> {
        self.created.lock().unwrap().push((name.to_string(), dimensions));
        Ok(())
    }

    async fn upsert(&self, _collection: &str, points: &[StoredChunk]) -> book_rag::Result<()> {
        let mut upserts = self.upserts.lock().unwrap();
        if self.fail_on_upsert == Some(upserts.len() + 1) {
            return Err(RagError::VectorStoreError {
                backend: "fake".into(),
                message: "write rejected".into(),
            });
        }
        upserts.push(points.to_vec());
        Ok(())
    }

    async fn search(
        &self,
        _collection: &str,
        _embedding: &[f32],
        top_k: usize,
    ) -> book_rag::Result<Vec<RetrievedItem>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(RagError::VectorStoreError {
                backend: "fake".into(),
                message: "search timed out".into(),
            });
        }
        Ok(self.results.iter().take(top_k).cloned().collect())
    }
}

/// A completion model that records prompts and replies with a fixed answer.
pub struct ScriptedModel {
    pub answer: String,
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
}

impl ScriptedModel {
    pub fn answering(answer: &str) -> Self {
        Self { answer: answer.to_string(), prompts: Mutex::new(Vec::new()), fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::answering("") }
    }

    pub fn prompt_log(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> book_rag::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(RagError::CompletionError {
                provider: "fake".into(),
                message: "rate limited".into(),
            });
        }
        Ok(self.answer.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn retrieved(content: &str, source: &str, score: f32) -> RetrievedItem {
    RetrievedItem {
        content: content.to_string(),
        source: source.to_string(),
        page: "chunk_0".to_string(),
        score,
    }
}

pub fn pipeline(
    config: RagConfig,
    embedder: Arc<HashEmbedder>,
    store: Arc<RecordingStore>,
    model: Arc<ScriptedModel>,
) -> RagPipeline {
    RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(store)
        .completion_model(model)
        .build()
        .expect("all required components set")
}
