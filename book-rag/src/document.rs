//! Data types for documents, chunks, retrieved items, and answers.

use serde::{Deserialize, Serialize};

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;

/// A source document: raw book text plus the file it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Source identifier, usually the file name.
    pub source: String,
    /// The raw text content of the document.
    pub text: String,
}

impl Document {
    /// Create a new document.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }
}

/// A segment of a [`Document`] ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Whitespace-normalized chunk text. Never empty.
    pub content: String,
    /// The source of the parent [`Document`].
    pub source: String,
    /// Display label for the chunk, `chunk_{chunk_index}`.
    pub page: String,
    /// Position of the chunk within its document, starting at 0.
    pub chunk_index: usize,
}

/// A [`Chunk`] paired with its vector and the integer point id it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    /// Point id in the vector store.
    pub id: u64,
    /// The chunk payload.
    pub chunk: Chunk,
    /// The embedding for the chunk content.
    pub embedding: Vec<f32>,
}

/// A passage used to ground an answer, with its similarity score.
///
/// The score is serialized as `relevance_score`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedItem {
    /// The passage text.
    pub content: String,
    /// Where the passage came from.
    pub source: String,
    /// Display label of the passage within its source.
    pub page: String,
    /// Similarity score (higher is more relevant, 1.0 for user selections).
    #[serde(rename = "relevance_score", alias = "score")]
    pub score: f32,
}

/// A question posed to the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskRequest {
    /// The user question, inserted verbatim into the prompt.
    pub question: String,
    /// Text the user highlighted. When non-empty it replaces retrieval entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    /// Number of chunks to retrieve.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl AskRequest {
    /// Create a request that retrieves [`DEFAULT_TOP_K`] chunks.
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), selected_text: None, top_k: DEFAULT_TOP_K }
    }

    /// Answer from the given text instead of the index.
    pub fn with_selected_text(mut self, text: impl Into<String>) -> Self {
        self.selected_text = Some(text.into());
        self
    }

    /// Override the number of chunks to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// The response to an [`AskRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResult {
    /// The generated (or canned) answer.
    pub answer: String,
    /// The grounding passages, truncated for display.
    pub sources: Vec<RetrievedItem>,
    /// Whether the answer was grounded on user-selected text.
    pub selected_text_used: bool,
}
