//! Configuration for chunking, retrieval, and session behaviour.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunking::MAX_CHUNK_WORDS;
use crate::error::{RagError, Result};

/// Every recognised engine option.
///
/// Deserialized configs are unchecked; call [`validate`](RagConfig::validate)
/// (or construct through [`RagConfig::builder`]) before use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Words per chunk.
    pub chunk_size: usize,
    /// Words shared between consecutive chunks of a document.
    pub chunk_overlap: usize,
    /// Chunks whose trimmed text is shorter than this (in characters) are dropped.
    pub min_chunk_chars: usize,
    /// Maximum number of ranked results per query.
    pub top_k: usize,
    /// Minimum cosine similarity for a chunk to count as relevant.
    pub similarity_threshold: f32,
    /// Character budget for the assembled context string.
    pub max_context_chars: usize,
    /// Number of conversation turns kept in memory.
    pub memory_depth: usize,
    /// Chunk texts sent to the embedder per call during a build.
    pub embed_batch_size: usize,
    /// Embedding batches allowed in flight at once during a build.
    pub embed_concurrency: usize,
    /// Deadline for a single `retrieve` call, in milliseconds.
    pub retrieval_timeout_ms: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 600,
            chunk_overlap: 50,
            min_chunk_chars: 10,
            top_k: 5,
            similarity_threshold: 0.2,
            max_context_chars: 12_000,
            memory_depth: 10,
            embed_batch_size: 32,
            embed_concurrency: 4,
            retrieval_timeout_ms: 30_000,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The retrieval deadline as a [`Duration`].
    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_millis(self.retrieval_timeout_ms)
    }

    /// Check every option against its valid range.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_WORDS {
            return Err(RagError::Configuration(format!(
                "chunk_size ({}) must be between 1 and {MAX_CHUNK_WORDS} words",
                self.chunk_size
            )));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Configuration("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(RagError::Configuration(format!(
                "similarity_threshold ({}) must be between 0 and 1",
                self.similarity_threshold
            )));
        }
        if self.max_context_chars == 0 {
            return Err(RagError::Configuration(
                "max_context_chars must be greater than zero".to_string(),
            ));
        }
        if self.memory_depth == 0 {
            return Err(RagError::Configuration(
                "memory_depth must be greater than zero".to_string(),
            ));
        }
        if self.embed_batch_size == 0 || self.embed_concurrency == 0 {
            return Err(RagError::Configuration(
                "embed_batch_size and embed_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.retrieval_timeout_ms == 0 {
            return Err(RagError::Configuration(
                "retrieval_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the chunk size in words.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in words.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the minimum trimmed chunk length in characters.
    pub fn min_chunk_chars(mut self, chars: usize) -> Self {
        self.config.min_chunk_chars = chars;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the character budget for assembled context.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Set how many conversation turns are remembered.
    pub fn memory_depth(mut self, depth: usize) -> Self {
        self.config.memory_depth = depth;
        self
    }

    /// Set the number of chunk texts embedded per provider call.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set how many embedding batches may be in flight during a build.
    pub fn embed_concurrency(mut self, concurrency: usize) -> Self {
        self.config.embed_concurrency = concurrency;
        self
    }

    /// Set the retrieval deadline.
    pub fn retrieval_timeout(mut self, timeout: Duration) -> Self {
        self.config.retrieval_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if any option is out of range,
    /// most notably when `chunk_overlap >= chunk_size`.
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
