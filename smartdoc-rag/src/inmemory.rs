//! Exact in-memory vector index using cosine similarity.
//!
//! This module provides [`InMemoryIndex`], a brute-force index that scores
//! every stored vector against the query. Vectors are L2-normalized on the way
//! in so a score is a single dot product. A linear scan comfortably serves
//! tens of thousands of chunks.

use std::collections::HashSet;

use crate::document::{Chunk, SearchResult};
use crate::embedding::l2_normalize;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorIndex;

/// An immutable brute-force cosine index.
///
/// Entries keep the order they were built in; that order is the tie-breaker
/// for equal scores. Construct through [`from_parts`](InMemoryIndex::from_parts),
/// [`IndexBuilder`](crate::builder::IndexBuilder), or
/// [`load`](InMemoryIndex::load).
#[derive(Debug, Clone)]
pub struct InMemoryIndex {
    dimensions: usize,
    embedder: String,
    pub(crate) chunks: Vec<Chunk>,
    /// Row-major `chunks.len() × dimensions`, each row unit length (or zero).
    pub(crate) vectors: Vec<f32>,
}

impl InMemoryIndex {
    /// An index with no chunks.
    pub fn empty(dimensions: usize, embedder: impl Into<String>) -> Self {
        Self { dimensions, embedder: embedder.into(), chunks: Vec::new(), vectors: Vec::new() }
    }

    /// Build an index from chunks and their embeddings, paired by position.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the counts differ, a vector
    /// has the wrong dimensionality, or a vector holds non-finite values.
    pub fn from_parts(
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        dimensions: usize,
        embedder: impl Into<String>,
    ) -> Result<Self> {
        let embedder = embedder.into();
        if chunks.len() != vectors.len() {
            return Err(RagError::embedding(
                &embedder,
                format!("{} embeddings returned for {} chunks", vectors.len(), chunks.len()),
            ));
        }

        let mut flat = Vec::with_capacity(chunks.len() * dimensions);
        for (chunk, mut vector) in chunks.iter().zip(vectors) {
            check_vector(&embedder, &vector, dimensions)
                .map_err(|e| annotate(e, &chunk.id))?;
            l2_normalize(&mut vector);
            flat.extend_from_slice(&vector);
        }

        Ok(Self { dimensions, embedder, chunks, vectors: flat })
    }

    /// Reassemble an index from already-normalized rows (used by `load`).
    pub(crate) fn from_normalized(
        chunks: Vec<Chunk>,
        vectors: Vec<f32>,
        dimensions: usize,
        embedder: String,
    ) -> Self {
        debug_assert_eq!(chunks.len() * dimensions, vectors.len());
        Self { dimensions, embedder, chunks, vectors }
    }

    /// Identifier of the embedder that produced the stored vectors.
    pub fn embedder(&self) -> &str {
        &self.embedder
    }

    /// The indexed chunks, in index order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of distinct source documents in the index.
    pub fn document_count(&self) -> usize {
        self.chunks.iter().map(|c| c.document_id.as_str()).collect::<HashSet<_>>().len()
    }

    /// A new index holding every entry except those of `document_ids`.
    ///
    /// Stored vectors are copied, not re-embedded.
    pub fn without_documents(&self, document_ids: &HashSet<&str>) -> Self {
        let mut chunks = Vec::new();
        let mut vectors = Vec::new();
        for (position, chunk) in self.chunks.iter().enumerate() {
            if !document_ids.contains(chunk.document_id.as_str()) {
                chunks.push(chunk.clone());
                vectors.extend_from_slice(self.row(position));
            }
        }
        Self { dimensions: self.dimensions, embedder: self.embedder.clone(), chunks, vectors }
    }

    /// A new index with `other`'s entries placed after this index's.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the two indexes come from
    /// different embedders or dimensionalities.
    pub fn merged_with(&self, other: &InMemoryIndex) -> Result<Self> {
        if self.embedder != other.embedder || self.dimensions != other.dimensions {
            return Err(RagError::embedding(
                &other.embedder,
                format!(
                    "cannot merge {}-dimensional '{}' vectors into {}-dimensional '{}' index",
                    other.dimensions, other.embedder, self.dimensions, self.embedder
                ),
            ));
        }
        let mut chunks = Vec::with_capacity(self.chunks.len() + other.chunks.len());
        chunks.extend_from_slice(&self.chunks);
        chunks.extend_from_slice(&other.chunks);
        let mut vectors = Vec::with_capacity(self.vectors.len() + other.vectors.len());
        vectors.extend_from_slice(&self.vectors);
        vectors.extend_from_slice(&other.vectors);
        Ok(Self { dimensions: self.dimensions, embedder: self.embedder.clone(), chunks, vectors })
    }

    fn row(&self, position: usize) -> &[f32] {
        let start = position * self.dimensions;
        &self.vectors[start..start + self.dimensions]
    }
}

impl VectorIndex for InMemoryIndex {
    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if self.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        check_vector(&self.embedder, query, self.dimensions)?;

        let mut query = query.to_vec();
        l2_normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = (0..self.chunks.len())
            .map(|position| {
                let dot = self.row(position).iter().zip(&query).map(|(a, b)| a * b).sum::<f32>();
                // -0.0 + 0.0 == +0.0, keeping zero scores tied under total_cmp
                (position, dot + 0.0)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| SearchResult { chunk: self.chunks[position].clone(), score })
            .collect())
    }
}

fn check_vector(embedder: &str, vector: &[f32], dimensions: usize) -> Result<()> {
    if vector.len() != dimensions {
        return Err(RagError::embedding(
            embedder,
            format!("expected {dimensions}-dimensional vector, got {}", vector.len()),
        ));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(RagError::embedding(embedder, "vector contains non-finite values"));
    }
    Ok(())
}

fn annotate(error: RagError, chunk_id: &str) -> RagError {
    match error {
        RagError::EmbeddingError { provider, message, transient } => RagError::EmbeddingError {
            provider,
            message: format!("chunk '{chunk_id}': {message}"),
            transient,
        },
        other => other,
    }
}
