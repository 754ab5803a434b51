//! Ingestion and question-answering tests against fake collaborators.

mod common;

use std::sync::Arc;

use book_rag::{
    AskRequest, Document, InputType, NO_RELEVANT_INFO_ANSWER, RagConfig, RagError, RagPipeline,
};
use common::{HashEmbedder, RecordingStore, ScriptedModel, pipeline, retrieved};

fn config() -> RagConfig {
    RagConfig::builder().max_words(4).batch_size(2).build().unwrap()
}

#[test]
fn builder_requires_completion_model() {
    let err = RagPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(HashEmbedder::default()))
        .vector_store(Arc::new(RecordingStore::default()))
        .build()
        .unwrap_err();
    assert!(matches!(err, RagError::ConfigError(ref m) if m.contains("completion_model")));
}

// ── ask ────────────────────────────────────────────────────────────

#[tokio::test]
async fn selected_text_bypasses_search() {
    let embedder = Arc::new(HashEmbedder::default());
    let store = Arc::new(RecordingStore::with_results(vec![retrieved("indexed", "a.md", 0.9)]));
    let model = Arc::new(ScriptedModel::answering("It is about ownership."));
    let pipeline = pipeline(config(), embedder.clone(), store.clone(), model.clone());

    let request = AskRequest::new("What is this about?").with_selected_text("Ownership rules.");
    let result = pipeline.ask(&request).await.unwrap();

    assert!(result.selected_text_used);
    assert_eq!(result.answer, "It is about ownership.");
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].content, "Ownership rules.");
    assert_eq!(result.sources[0].source, "user_selection");
    assert_eq!(result.sources[0].page, "selected");
    assert_eq!(result.sources[0].score, 1.0);

    assert_eq!(store.search_count(), 0);
    assert!(embedder.call_log().is_empty());
    let prompts = model.prompt_log();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Selected Text:\nOwnership rules."));
    assert!(!prompts[0].contains("indexed"));
}

#[tokio::test]
async fn empty_selected_text_falls_back_to_search() {
    let embedder = Arc::new(HashEmbedder::default());
    let store = Arc::new(RecordingStore::with_results(vec![retrieved("indexed", "a.md", 0.9)]));
    let model = Arc::new(ScriptedModel::answering("answer"));
    let pipeline = pipeline(config(), embedder, store.clone(), model);

    let result = pipeline.ask(&AskRequest::new("Q").with_selected_text("")).await.unwrap();

    assert!(!result.selected_text_used);
    assert_eq!(store.search_count(), 1);
    assert_eq!(result.sources[0].content, "indexed");
}

#[tokio::test]
async fn empty_retrieval_short_circuits() {
    let store = Arc::new(RecordingStore::default());
    let model = Arc::new(ScriptedModel::answering("should not be used"));
    let pipeline = pipeline(config(), Arc::new(HashEmbedder::default()), store.clone(), model.clone());

    let result = pipeline.ask(&AskRequest::new("Anything?")).await.unwrap();

    assert_eq!(result.answer, NO_RELEVANT_INFO_ANSWER);
    assert!(result.sources.is_empty());
    assert!(!result.selected_text_used);
    assert_eq!(store.search_count(), 1);
    assert!(model.prompt_log().is_empty());
}

#[tokio::test]
async fn retrieved_chunks_ground_the_prompt() {
    let long = "word ".repeat(60);
    let embedder = Arc::new(HashEmbedder::default());
    let store = Arc::new(RecordingStore::with_results(vec![
        retrieved("First passage.", "intro.mdx", 0.91),
        retrieved(&long, "ch2.mdx", 0.75),
        retrieved("Third passage.", "ch3.mdx", 0.5),
    ]));
    let model = Arc::new(ScriptedModel::answering("Grounded answer."));
    let pipeline = pipeline(config(), embedder.clone(), store, model.clone());

    let result = pipeline.ask(&AskRequest::new("Explain chunking").with_top_k(2)).await.unwrap();

    assert_eq!(result.answer, "Grounded answer.");
    assert!(!result.selected_text_used);
    assert_eq!(result.sources.len(), 2);
    assert_eq!(result.sources[0].source, "intro.mdx");
    assert_eq!(result.sources[0].score, 0.91);
    assert_eq!(result.sources[1].content.chars().count(), 203);
    assert!(result.sources[1].content.ends_with("..."));

    assert_eq!(embedder.call_log(), vec![(1, InputType::Query)]);
    let prompt = &model.prompt_log()[0];
    assert!(prompt.contains(&format!("Book Content:\nFirst passage.\n\n{long}\n\nQuestion: Explain chunking")));
    assert!(!prompt.contains("Third passage."));
}

#[tokio::test]
async fn search_failure_is_an_error_not_an_empty_answer() {
    let store = Arc::new(RecordingStore { fail_search: true, ..RecordingStore::default() });
    let model = Arc::new(ScriptedModel::answering("unused"));
    let pipeline = pipeline(config(), Arc::new(HashEmbedder::default()), store, model.clone());

    let err = pipeline.ask(&AskRequest::new("Q")).await.unwrap_err();

    assert!(matches!(err, RagError::VectorStoreError { .. }));
    assert!(model.prompt_log().is_empty());
}

#[tokio::test]
async fn query_embedding_failure_propagates() {
    let store = Arc::new(RecordingStore::with_results(vec![retrieved("x", "a.md", 0.9)]));
    let pipeline = pipeline(
        config(),
        Arc::new(HashEmbedder::failing()),
        store.clone(),
        Arc::new(ScriptedModel::answering("unused")),
    );

    let err = pipeline.ask(&AskRequest::new("Q")).await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingError { .. }));
    assert_eq!(store.search_count(), 0);
}

#[tokio::test]
async fn completion_failure_propagates() {
    let store = Arc::new(RecordingStore::with_results(vec![retrieved("x", "a.md", 0.9)]));
    let pipeline = pipeline(
        config(),
        Arc::new(HashEmbedder::default()),
        store,
        Arc::new(ScriptedModel::failing()),
    );

    let err = pipeline.ask(&AskRequest::new("Q")).await.unwrap_err();
    assert!(matches!(err, RagError::CompletionError { .. }));
}

// ── ingest ─────────────────────────────────────────────────────────

fn book() -> Vec<Document> {
    vec![
        // max_words = 4 → two chunks
        Document::new("intro.mdx", "One two three. Four five six. Seven."),
        // two chunks
        Document::new("ch1.md", "Alpha beta gamma delta epsilon. Zeta."),
    ]
}

#[tokio::test]
async fn ingest_embeds_and_upserts_in_batches() {
    let embedder = Arc::new(HashEmbedder::default());
    let store = Arc::new(RecordingStore::default());
    let pipeline =
        pipeline(config(), embedder.clone(), store.clone(), Arc::new(ScriptedModel::answering("")));

    let stored = pipeline.ingest(&book()).await.unwrap();

    assert_eq!(stored, 4);
    assert_eq!(
        store.created.lock().unwrap().clone(),
        vec![("book_content".to_string(), HashEmbedder::DIMENSIONS)]
    );
    assert_eq!(store.upserted_ids(), vec![vec![0, 1], vec![2, 3]]);
    assert_eq!(embedder.call_log(), vec![(2, InputType::Document), (2, InputType::Document)]);

    let upserts = store.upserts.lock().unwrap();
    let chunks: Vec<_> = upserts.iter().flatten().map(|p| &p.chunk).collect();
    assert_eq!(chunks[0].content, "One two three.");
    assert_eq!(chunks[1].content, "Four five six. Seven.");
    assert_eq!(chunks[2].source, "ch1.md");
    assert_eq!(chunks[2].chunk_index, 0);
    assert_eq!(chunks[3].page, "chunk_1");
    assert!(upserts.iter().flatten().all(|p| p.embedding.len() == HashEmbedder::DIMENSIONS));
}

#[tokio::test]
async fn failed_batch_stops_ingestion() {
    let store = Arc::new(RecordingStore { fail_on_upsert: Some(1), ..RecordingStore::default() });
    let embedder = Arc::new(HashEmbedder::default());
    let pipeline =
        pipeline(config(), embedder.clone(), store.clone(), Arc::new(ScriptedModel::answering("")));

    let err = pipeline.ingest(&book()).await.unwrap_err();

    assert!(matches!(err, RagError::PipelineError(ref m) if m.starts_with("batch 1 failed")));
    assert!(store.upserted_ids().is_empty());
    assert_eq!(embedder.call_log().len(), 1);
}

#[tokio::test]
async fn embedding_failure_names_the_batch() {
    let store = Arc::new(RecordingStore::default());
    let pipeline = pipeline(
        config(),
        Arc::new(HashEmbedder::failing()),
        store.clone(),
        Arc::new(ScriptedModel::answering("")),
    );

    let err = pipeline.ingest(&book()).await.unwrap_err();
    assert!(err.to_string().contains("batch 1 failed"));
    assert!(err.to_string().contains("embedding service unavailable"));
    assert!(store.upserted_ids().is_empty());
}

#[tokio::test]
async fn empty_book_stores_nothing() {
    let store = Arc::new(RecordingStore::default());
    let pipeline = pipeline(
        config(),
        Arc::new(HashEmbedder::default()),
        store.clone(),
        Arc::new(ScriptedModel::answering("")),
    );

    let stored = pipeline.ingest(&[Document::new("empty.md", "  ### ")]).await.unwrap();

    assert_eq!(stored, 0);
    assert!(store.created.lock().unwrap().is_empty());
    assert!(store.upserted_ids().is_empty());
}
