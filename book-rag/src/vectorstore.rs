//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{RetrievedItem, StoredChunk};
use crate::error::Result;

/// A storage backend for chunk embeddings with similarity search.
///
/// Points are keyed by integer id and carry the chunk as payload
/// (`content`, `source`, `page`, `chunk_index`).
///
/// # Example
///
/// ```rust,ignore
/// use book_rag::VectorStore;
///
/// store.create_collection("book_content", 1024).await?;
/// store.upsert("book_content", &points).await?;
/// let items = store.search("book_content", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection using cosine distance. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Insert or replace points in a collection.
    async fn upsert(&self, collection: &str, points: &[StoredChunk]) -> Result<()>;

    /// Search for the `top_k` chunks most similar to the given embedding.
    ///
    /// Returns items ordered by descending similarity score. An empty
    /// collection yields an empty `Vec`, not an error.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedItem>>;
}
