//! # book-rag
//!
//! Retrieval-augmented question answering over book content.
//!
//! ## Overview
//!
//! - [`SentenceChunker`] splits chapters into sentence-aligned chunks of
//!   roughly `max_words` words, without ever dropping text.
//! - [`RagPipeline`] embeds and stores chunks in batches, and answers
//!   questions by grounding a prompt on either user-selected text or the
//!   closest stored chunks.
//! - [`composer`] holds the grounding and prompt rules on their own, so they
//!   can be used with any [`Retriever`].
//!
//! External services sit behind the [`EmbeddingProvider`], [`VectorStore`]
//! and [`CompletionModel`] traits.
//!
//! ## Features
//!
//! - `cohere` – [`cohere::CohereEmbeddingProvider`] and [`cohere::CohereChatModel`]
//! - `qdrant` – [`qdrant::QdrantVectorStore`]
//! - `full` – both of the above

pub mod chunking;
pub mod completion;
pub mod composer;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod vectorstore;

#[cfg(feature = "cohere")]
pub mod cohere;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{Chunker, SentenceChunker, chunk_text, clean_text};
pub use completion::CompletionModel;
pub use composer::{
    GroundingContext, NO_RELEVANT_INFO_ANSWER, Retriever, answer_context, compose_prompt,
    format_sources,
};
pub use config::{
    CompletionConfig, DEFAULT_COLLECTION, EmbeddingConfig, ProviderSettings, RagConfig,
    RagConfigBuilder,
};
pub use document::{AnswerResult, AskRequest, Chunk, Document, RetrievedItem, StoredChunk};
pub use embedding::{EmbeddingProvider, InputType};
pub use error::{RagError, Result};
pub use loader::load_book_directory;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use vectorstore::VectorStore;
