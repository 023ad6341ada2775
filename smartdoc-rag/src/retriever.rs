//! Query-time retrieval: embed → search → threshold → assemble context.
//!
//! A [`Retriever`] holds a snapshot of one index. Rebuilding the session's
//! index never affects a retriever already handed out.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorIndex;

/// Separator placed between chunk texts in an assembled context.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Text handed to answer generation when nothing passed the threshold.
pub const NO_RELEVANT_CONTENT: &str = "No relevant context found in the uploaded document.";

/// Default character budget for assembled context.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;

/// Default deadline for one `retrieve` call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether a query found anything usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalStatus {
    /// At least one chunk met the similarity threshold.
    Relevant,
    /// The threshold filtered out every candidate. Not an error.
    NoRelevantContent,
}

/// The outcome of one query.
///
/// `context` stays within the retriever's character budget, with one
/// exception: a top-ranked chunk longer than the budget is kept whole, since
/// chunks are never cut. Compare `context` against the budget if that matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retrieval {
    /// Chunks at or above the threshold, by descending score (at most `top_k`).
    pub hits: Vec<SearchResult>,
    /// How many leading `hits` fit into `context`.
    pub used: usize,
    /// Texts of the used hits joined by [`CONTEXT_DELIMITER`].
    pub context: String,
    /// Unique document ids of the used hits, in rank order.
    pub sources: Vec<String>,
    /// Whether any chunk met the threshold.
    pub status: RetrievalStatus,
}

impl Retrieval {
    /// A result carrying no context.
    pub fn no_relevant_content() -> Self {
        Self {
            hits: Vec::new(),
            used: 0,
            context: String::new(),
            sources: Vec::new(),
            status: RetrievalStatus::NoRelevantContent,
        }
    }

    /// True when at least one chunk met the similarity threshold.
    pub fn has_relevant_content(&self) -> bool {
        self.status == RetrievalStatus::Relevant
    }

    /// The context, or [`NO_RELEVANT_CONTENT`] when nothing was found.
    pub fn context_or_marker(&self) -> &str {
        match self.status {
            RetrievalStatus::Relevant => &self.context,
            RetrievalStatus::NoRelevantContent => NO_RELEVANT_CONTENT,
        }
    }

    /// The hits that made it into the context.
    pub fn used_hits(&self) -> &[SearchResult] {
        &self.hits[..self.used]
    }
}

/// Answers queries against one index snapshot.
///
/// # Example
///
/// ```rust,ignore
/// let retriever = Retriever::new(embedder, index).max_context_chars(8_000);
/// let retrieval = retriever.retrieve("What is the refund policy?", 5, 0.2).await?;
/// if !retrieval.has_relevant_content() {
///     println!("nothing relevant found");
/// }
/// ```
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    max_context_chars: usize,
    timeout: Duration,
}

impl Retriever {
    /// Create a retriever over `index`, embedding queries with `embedding_provider`.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            embedding_provider,
            index,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the character budget for the assembled context.
    ///
    /// Lower-ranked chunks are dropped to stay within it. The top-ranked chunk
    /// is always kept whole, so a single chunk longer than `chars` overruns it.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.max_context_chars = chars;
        self
    }

    /// Set the deadline for each `retrieve` call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The index this retriever searches.
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Find the chunks relevant to `question` and assemble them into context.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] for a blank question
    /// - [`RagError::Configuration`] for `top_k == 0` or a threshold outside `[0, 1]`
    /// - [`RagError::EmbeddingError`] if the question cannot be embedded
    /// - [`RagError::RetrievalTimeout`] if the deadline passes first
    pub async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
        similarity_threshold: f32,
    ) -> Result<Retrieval> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidInput("question must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(RagError::Configuration("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(RagError::Configuration(format!(
                "similarity_threshold ({similarity_threshold}) must be between 0 and 1"
            )));
        }

        let search = self.retrieve_inner(question, top_k, similarity_threshold);
        tokio::time::timeout(self.timeout, search)
            .await
            .map_err(|_| {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "retrieval timed out");
                RagError::RetrievalTimeout { timeout: self.timeout }
            })?
    }

    async fn retrieve_inner(
        &self,
        question: &str,
        top_k: usize,
        similarity_threshold: f32,
    ) -> Result<Retrieval> {
        let query = self.embedding_provider.embed(question).await.map_err(|e| match e {
            e @ RagError::EmbeddingError { .. } => e,
            other => RagError::embedding(self.embedding_provider.name(), other.to_string()),
        })?;

        let candidates = self.index.search(&query, top_k)?;
        let candidate_count = candidates.len();
        let hits: Vec<SearchResult> =
            candidates.into_iter().filter(|r| r.score >= similarity_threshold).collect();

        if hits.is_empty() {
            info!(candidate_count, similarity_threshold, "no chunk met the similarity threshold");
            return Ok(Retrieval::no_relevant_content());
        }

        let (context, used) = assemble_context(&hits, self.max_context_chars);
        let mut sources: Vec<String> = Vec::new();
        for hit in &hits[..used] {
            if !sources.contains(&hit.chunk.document_id) {
                sources.push(hit.chunk.document_id.clone());
            }
        }

        info!(hit_count = hits.len(), used, source_count = sources.len(), "retrieval completed");
        Ok(Retrieval { hits, used, context, sources, status: RetrievalStatus::Relevant })
    }
}

/// Join ranked chunk texts within `max_chars`, returning the context and how
/// many leading hits it holds.
///
/// Chunks are never cut; the first chunk that would overflow the budget is
/// dropped together with every lower-ranked one. The top-ranked chunk is
/// always kept so a relevant result never turns into an empty context.
pub fn assemble_context(hits: &[SearchResult], max_chars: usize) -> (String, usize) {
    let delimiter_chars = CONTEXT_DELIMITER.chars().count();
    let mut context = String::new();
    let mut context_chars = 0;
    let mut used = 0;

    for hit in hits {
        let chunk_chars = hit.chunk.text.chars().count();
        let added = if used == 0 { chunk_chars } else { delimiter_chars + chunk_chars };

        if used > 0 && context_chars + added > max_chars {
            debug!(dropped = hits.len() - used, max_chars, "context budget reached");
            break;
        }
        if used == 0 && chunk_chars > max_chars {
            warn!(
                chunk_id = %hit.chunk.id,
                chunk_chars,
                max_chars,
                "top chunk exceeds context budget"
            );
        }

        if used > 0 {
            context.push_str(CONTEXT_DELIMITER);
        }
        context.push_str(&hit.chunk.text);
        context_chars += added;
        used += 1;
    }

    (context, used)
}
