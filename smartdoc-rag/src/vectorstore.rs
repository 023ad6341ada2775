//! Search contract shared by every vector index implementation.

use crate::document::SearchResult;
use crate::error::Result;

/// A read-only nearest-neighbour index over chunk embeddings.
///
/// Implementations are immutable once built, so concurrent `search` calls
/// from several queries never observe each other. Exact and approximate
/// indexes are interchangeable behind this trait.
///
/// # Example
///
/// ```rust,ignore
/// use smartdoc_rag::{InMemoryIndex, VectorIndex};
///
/// let index = InMemoryIndex::from_parts(chunks, vectors, 384, "hashing-fnv1a-d384")?;
/// let results = index.search(&query_embedding, 5)?;
/// ```
pub trait VectorIndex: Send + Sync {
    /// Number of indexed chunks.
    fn len(&self) -> usize;

    /// Whether the index holds no chunks.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality every stored and query vector must have.
    fn dimensions(&self) -> usize;

    /// Return up to `top_k` chunks most similar to `query`.
    ///
    /// Results are ordered by descending score; equal scores keep index order
    /// (lower position first). An empty index yields an empty `Vec`.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;
}
