//! Per-user session: the active index, the document set behind it, and the
//! conversation memory.
//!
//! Every change to the document set builds a new [`InMemoryIndex`] and swaps
//! the active reference only after the build succeeds. Queries running
//! against the previous index keep their snapshot until they finish.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::builder::IndexBuilder;
use crate::chunking::{Chunker, WordWindowChunker};
use crate::config::RagConfig;
use crate::document::Document;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryIndex;
use crate::memory::{ConversationMemory, Turn};
use crate::retriever::{Retrieval, Retriever};
use crate::retry::RetryPolicy;
use crate::synthesizer::{AnswerSynthesizer, clean_response};
use crate::vectorstore::VectorIndex;

/// Summary of one ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestReport {
    /// Documents submitted in this call.
    pub documents: usize,
    /// Chunks embedded in this call.
    pub chunks: usize,
    /// Submitted documents that produced no chunks (blank or too short).
    pub skipped: Vec<String>,
    /// Chunks in the active index after the swap.
    pub total_chunks: usize,
    /// Wall-clock time spent chunking and embedding.
    pub elapsed: Duration,
}

/// Shape of the active index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexStats {
    /// Chunks in the index.
    pub chunk_count: usize,
    /// Distinct source documents behind those chunks.
    pub document_count: usize,
    /// Vector length of the embedder that built the index.
    pub dimensions: usize,
    /// Identifier of that embedder.
    pub embedder: String,
    /// Mean chunk length in characters (0 for an empty index).
    pub avg_chunk_chars: f64,
    /// Shortest chunk in characters (0 for an empty index).
    pub min_chunk_chars: usize,
    /// Longest chunk in characters (0 for an empty index).
    pub max_chunk_chars: usize,
}

/// An answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The cleaned answer text, as recorded in memory.
    pub text: String,
    /// The retrieval the answer was grounded on.
    pub retrieval: Retrieval,
}

/// A single user's document set, index, and conversation.
///
/// # Example
///
/// ```rust,ignore
/// let session = Session::builder()
///     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
///     .synthesizer(Arc::new(ExtractiveSynthesizer))
///     .build()?;
///
/// session.ingest(vec![Document::new("handbook", text)], &CancellationToken::new()).await?;
/// let answer = session.ask("How many vacation days do I get?").await?;
/// println!("{}", answer.text);
/// ```
pub struct Session {
    id: Uuid,
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    retry_policy: RetryPolicy,
    index: RwLock<Arc<InMemoryIndex>>,
    memory: Mutex<ConversationMemory>,
    /// Held for the whole of a rebuild so document-set changes apply in order.
    rebuild: Mutex<()>,
}

impl Session {
    /// Create a new builder for constructing a [`Session`].
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Unique identifier of this session, attached to its log spans.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The validated configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The provider used for both ingestion and queries.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Replace the whole document set with `documents` and rebuild.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] for blank or duplicate document ids
    /// - [`RagError::EmbeddingError`] if embedding fails after retries
    /// - [`RagError::Cancelled`] if `cancel` fires first
    ///
    /// On error the previous index stays active.
    #[instrument(skip(self, documents, cancel), fields(session_id = %self.id))]
    pub async fn ingest(
        &self,
        documents: Vec<Document>,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        self.rebuild_with(documents, true, cancel).await
    }

    /// Add `documents` to the set, replacing any already indexed under the
    /// same id. Chunks of untouched documents are carried over without
    /// re-embedding.
    ///
    /// # Errors
    ///
    /// Same as [`ingest`](Session::ingest).
    #[instrument(skip(self, documents, cancel), fields(session_id = %self.id))]
    pub async fn add_documents(
        &self,
        documents: Vec<Document>,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        self.rebuild_with(documents, false, cancel).await
    }

    /// Drop every chunk of `document_id`. Returns whether anything was removed.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn remove_document(&self, document_id: &str) -> bool {
        let _rebuild = self.rebuild.lock().await;
        let current = self.index_snapshot().await;

        let ids = HashSet::from([document_id]);
        let next = current.without_documents(&ids);
        let removed = current.len() - next.len();
        if removed == 0 {
            return false;
        }

        *self.index.write().await = Arc::new(next);
        info!(document_id, removed_chunks = removed, "removed document from index");
        true
    }

    async fn rebuild_with(
        &self,
        documents: Vec<Document>,
        replace_all: bool,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        check_document_ids(&documents)?;
        let _rebuild = self.rebuild.lock().await;
        let started = Instant::now();

        let chunker = WordWindowChunker::new(self.config.chunk_size, self.config.chunk_overlap)?
            .with_min_chunk_chars(self.config.min_chunk_chars);
        let mut chunks = Vec::new();
        let mut skipped = Vec::new();
        for document in &documents {
            let document_chunks = chunker.chunk(document);
            if document_chunks.is_empty() {
                warn!(document_id = %document.id, "document produced no chunks");
                skipped.push(document.id.clone());
            }
            chunks.extend(document_chunks);
        }
        let chunk_count = chunks.len();

        let built = IndexBuilder::new(Arc::clone(&self.embedding_provider))
            .batch_size(self.config.embed_batch_size)
            .concurrency(self.config.embed_concurrency)
            .retry_policy(self.retry_policy.clone())
            .build(chunks, cancel)
            .await?;
        if cancel.is_cancelled() {
            return Err(RagError::Cancelled);
        }

        let base = if replace_all {
            self.empty_index()
        } else {
            let replaced: HashSet<&str> = documents.iter().map(|d| d.id.as_str()).collect();
            self.index_snapshot().await.without_documents(&replaced)
        };
        let next = base.merged_with(&built)?;
        let total_chunks = next.len();
        *self.index.write().await = Arc::new(next);

        let report = IngestReport {
            documents: documents.len(),
            chunks: chunk_count,
            skipped,
            total_chunks,
            elapsed: started.elapsed(),
        };
        info!(
            documents = report.documents,
            chunks = report.chunks,
            total_chunks,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "index swapped"
        );
        Ok(report)
    }

    async fn index_snapshot(&self) -> Arc<InMemoryIndex> {
        Arc::clone(&*self.index.read().await)
    }

    /// A retriever over the index active right now.
    ///
    /// Later rebuilds do not affect the returned retriever.
    pub async fn retriever(&self) -> Retriever {
        let index: Arc<dyn VectorIndex> = self.index_snapshot().await;
        Retriever::new(Arc::clone(&self.embedding_provider), index)
            .max_context_chars(self.config.max_context_chars)
            .timeout(self.config.retrieval_timeout())
    }

    /// Retrieve context for `question` using the configured `top_k` and
    /// similarity threshold. No retry is applied.
    pub async fn retrieve(&self, question: &str) -> Result<Retrieval> {
        self.retriever()
            .await
            .retrieve(question, self.config.top_k, self.config.similarity_threshold)
            .await
    }

    /// Answer `question` from the documents and the recent conversation,
    /// then record the turn.
    ///
    /// Retrieval and synthesis are each wrapped by the session's retry
    /// policy. A [`NoRelevantContent`](crate::RetrievalStatus::NoRelevantContent)
    /// retrieval still reaches the synthesizer, which receives the marker
    /// text instead of context.
    ///
    /// # Errors
    ///
    /// Any retrieval or synthesis error left after retries. Failed questions
    /// are not recorded in memory.
    #[instrument(skip(self, question), fields(session_id = %self.id))]
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let retriever = self.retriever().await;
        let (top_k, threshold) = (self.config.top_k, self.config.similarity_threshold);
        let retrieval = self
            .retry_policy
            .run("retrieve", || retriever.retrieve(question, top_k, threshold))
            .await?;

        let history = self.memory.lock().await.recent(self.config.memory_depth);
        let context = retrieval.context_or_marker();
        let raw = self
            .retry_policy
            .run("synthesize answer", || self.synthesizer.generate(question, context, &history))
            .await?;
        let text = clean_response(&raw);

        self.memory.lock().await.append(Turn::new(question, text.clone()));
        info!(
            relevant = retrieval.has_relevant_content(),
            sources = retrieval.sources.len(),
            history_turns = history.len(),
            "answered question"
        );
        Ok(Answer { text, retrieval })
    }

    /// Recorded turns, oldest first.
    pub async fn history(&self) -> Vec<Turn> {
        self.memory.lock().await.iter().cloned().collect()
    }

    /// Forget the conversation; the index is untouched.
    pub async fn reset_conversation(&self) {
        self.memory.lock().await.clear();
        info!(session_id = %self.id, "conversation cleared");
    }

    /// Drop every document and start over with an empty index.
    pub async fn reset_index(&self) {
        let _rebuild = self.rebuild.lock().await;
        *self.index.write().await = Arc::new(self.empty_index());
        info!(session_id = %self.id, "index cleared");
    }

    /// Chunk, document, and length statistics for the active index.
    pub async fn stats(&self) -> IndexStats {
        let index = self.index_snapshot().await;
        let lengths: Vec<usize> = index.chunks().iter().map(|c| c.text.chars().count()).collect();
        let total: usize = lengths.iter().sum();

        IndexStats {
            chunk_count: index.len(),
            document_count: index.document_count(),
            dimensions: index.dimensions(),
            embedder: index.embedder().to_string(),
            avg_chunk_chars: if lengths.is_empty() {
                0.0
            } else {
                total as f64 / lengths.len() as f64
            },
            min_chunk_chars: lengths.iter().copied().min().unwrap_or(0),
            max_chunk_chars: lengths.iter().copied().max().unwrap_or(0),
        }
    }

    /// Write the active index to `dir`.
    pub async fn persist_index(&self, dir: impl AsRef<Path>) -> Result<()> {
        let index = self.index_snapshot().await;
        index.persist(dir)
    }

    /// Replace the active index with one previously persisted to `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexLoad`] if the artifacts are missing or
    /// corrupt, or were built by a different embedder or dimensionality than
    /// this session uses. The active index is unchanged on error.
    #[instrument(skip(self, dir), fields(session_id = %self.id))]
    pub async fn load_index(&self, dir: impl AsRef<Path>) -> Result<IndexStats> {
        let dir = dir.as_ref();
        let loaded = InMemoryIndex::load(dir)?;

        let provider = &self.embedding_provider;
        if loaded.embedder() != provider.name() || loaded.dimensions() != provider.dimensions() {
            return Err(RagError::index_load(
                dir,
                format!(
                    "index was built with '{}' ({} dimensions) but this session embeds with '{}' ({} dimensions)",
                    loaded.embedder(),
                    loaded.dimensions(),
                    provider.name(),
                    provider.dimensions()
                ),
            ));
        }

        {
            let _rebuild = self.rebuild.lock().await;
            *self.index.write().await = Arc::new(loaded);
        }
        Ok(self.stats().await)
    }

    fn empty_index(&self) -> InMemoryIndex {
        InMemoryIndex::empty(self.embedding_provider.dimensions(), self.embedding_provider.name())
    }
}

fn check_document_ids(documents: &[Document]) -> Result<()> {
    let mut seen = HashSet::with_capacity(documents.len());
    for document in documents {
        if document.id.trim().is_empty() {
            return Err(RagError::InvalidInput("document id must not be empty".to_string()));
        }
        if !seen.insert(document.id.as_str()) {
            return Err(RagError::InvalidInput(format!("duplicate document id '{}'", document.id)));
        }
    }
    Ok(())
}

/// Builder for constructing a [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    synthesizer: Option<Arc<dyn AnswerSynthesizer>>,
    retry_policy: Option<RetryPolicy>,
}

impl SessionBuilder {
    /// Set the configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider (required).
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the answer synthesizer (required).
    pub fn synthesizer(mut self, synthesizer: Arc<dyn AnswerSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Set the retry policy for embedding and synthesis calls.
    /// Defaults to [`RetryPolicy::default`].
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the [`Session`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if a required component is missing
    /// or the configuration is invalid.
    pub fn build(self) -> Result<Session> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::Configuration("embedding_provider is required".to_string())
        })?;
        let synthesizer = self
            .synthesizer
            .ok_or_else(|| RagError::Configuration("synthesizer is required".to_string()))?;

        let empty =
            InMemoryIndex::empty(embedding_provider.dimensions(), embedding_provider.name());
        let session = Session {
            id: Uuid::new_v4(),
            memory: Mutex::new(ConversationMemory::new(config.memory_depth)),
            config,
            embedding_provider,
            synthesizer,
            retry_policy: self.retry_policy.unwrap_or_default(),
            index: RwLock::new(Arc::new(empty)),
            rebuild: Mutex::new(()),
        };
        info!(
            session_id = %session.id,
            embedder = session.embedding_provider.name(),
            "session created"
        );
        Ok(session)
    }
}
