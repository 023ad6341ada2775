//! Embedding chunks and assembling an [`InMemoryIndex`].
//!
//! Builds are all-or-nothing: the index value only exists once every chunk
//! has a valid embedding, so a failed or cancelled build leaves nothing
//! half-populated behind.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryIndex;
use crate::retry::RetryPolicy;
use crate::vectorstore::VectorIndex;

/// Embeds chunks in batches and produces an [`InMemoryIndex`].
///
/// Up to `concurrency` batches are in flight at once; results are reassembled
/// in chunk order regardless of completion order.
///
/// # Example
///
/// ```rust,ignore
/// let builder = IndexBuilder::new(embedder).batch_size(32).concurrency(4);
/// let index = builder.build(chunks, &CancellationToken::new()).await?;
/// ```
pub struct IndexBuilder {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    concurrency: usize,
    retry_policy: RetryPolicy,
}

impl IndexBuilder {
    /// Create a builder embedding with `embedding_provider`.
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedding_provider,
            batch_size: 32,
            concurrency: 1,
            retry_policy: RetryPolicy::none(),
        }
    }

    /// Set how many chunk texts are sent per embedding call (minimum 1).
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set how many embedding calls may run concurrently (minimum 1).
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the retry policy applied to each embedding call.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Embed every chunk and build the index.
    ///
    /// Cancellation is checked between batches; once observed, in-flight
    /// calls are dropped and no index is produced.
    ///
    /// # Errors
    ///
    /// - [`RagError::Cancelled`] if `cancel` fires before the build finishes
    /// - [`RagError::EmbeddingError`] if any batch fails (after retries) or
    ///   returns the wrong number of vectors or a vector of the wrong size
    pub async fn build(
        &self,
        chunks: Vec<Chunk>,
        cancel: &CancellationToken,
    ) -> Result<InMemoryIndex> {
        let provider_name = self.embedding_provider.name().to_string();
        let dimensions = self.embedding_provider.dimensions();

        if chunks.is_empty() {
            info!(embedder = %provider_name, "built empty index");
            return Ok(InMemoryIndex::empty(dimensions, provider_name));
        }
        if cancel.is_cancelled() {
            return Err(RagError::Cancelled);
        }

        let batch_count = chunks.len().div_ceil(self.batch_size);
        let mut batches = stream::iter(chunks.chunks(self.batch_size).enumerate())
            .map(|(batch_index, batch)| self.embed_batch(batch_index, batch))
            .buffered(self.concurrency);

        let mut vectors = Vec::with_capacity(chunks.len());
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(embedded = vectors.len(), total = chunks.len(), "index build cancelled");
                    return Err(RagError::Cancelled);
                }
                next = batches.next() => next,
            };
            match next {
                Some(Ok(batch_vectors)) => vectors.extend(batch_vectors),
                Some(Err(e)) => {
                    error!(error = %e, "embedding failed during index build");
                    return Err(e);
                }
                None => break,
            }
        }
        drop(batches);

        let index = InMemoryIndex::from_parts(chunks, vectors, dimensions, provider_name)?;
        info!(
            chunk_count = index.len(),
            batch_count,
            dimensions,
            "built index"
        );
        Ok(index)
    }

    async fn embed_batch(&self, batch_index: usize, batch: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
        let vectors = self
            .retry_policy
            .run("embed chunk batch", || self.embedding_provider.embed_batch(&texts))
            .await?;

        if vectors.len() != batch.len() {
            return Err(RagError::embedding(
                self.embedding_provider.name(),
                format!(
                    "batch {batch_index}: {} embeddings returned for {} chunks",
                    vectors.len(),
                    batch.len()
                ),
            ));
        }
        debug!(batch_index, batch_size = batch.len(), "embedded batch");
        Ok(vectors)
    }
}
