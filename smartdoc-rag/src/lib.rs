//! Document retrieval engine for SmartDoc.
//!
//! This crate provides:
//! - Word-window chunking of already-extracted document text
//! - An embedding boundary ([`EmbeddingProvider`]) with an offline hashing embedder
//! - An exact cosine [`InMemoryIndex`] with batched, cancellable builds and
//!   on-disk persistence
//! - Threshold filtering and bounded context assembly in the [`Retriever`]
//! - Bounded [`ConversationMemory`] and an [`AnswerSynthesizer`] boundary
//! - A [`Session`] tying these together with atomic index swaps and retries
//!
//! # Feature flags
//!
//! - `openai` – OpenAI-compatible embeddings and chat completions over `reqwest`
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use smartdoc_rag::{Document, ExtractiveSynthesizer, HashingEmbeddingProvider, Session};
//! use tokio_util::sync::CancellationToken;
//!
//! let session = Session::builder()
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .synthesizer(Arc::new(ExtractiveSynthesizer))
//!     .build()?;
//! session.ingest(vec![Document::new("notes", text)], &CancellationToken::new()).await?;
//! let answer = session.ask("What changed in the second release?").await?;
//! ```

pub mod builder;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod memory;
pub mod persist;
pub mod retriever;
pub mod retry;
pub mod session;
pub mod synthesizer;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;

pub use builder::IndexBuilder;
pub use chunking::{Chunker, MAX_CHUNK_WORDS, WordWindow, WordWindowChunker, chunk_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use error::{RagError, Result};
pub use inmemory::InMemoryIndex;
pub use memory::{ConversationMemory, Turn};
pub use retriever::{
    CONTEXT_DELIMITER, NO_RELEVANT_CONTENT, Retrieval, RetrievalStatus, Retriever,
    assemble_context,
};
pub use retry::RetryPolicy;
pub use session::{Answer, IndexStats, IngestReport, Session, SessionBuilder};
pub use synthesizer::{
    AnswerSynthesizer, ExtractiveSynthesizer, NOT_FOUND_ANSWER, PromptMessage, Role,
    build_messages, clean_response,
};
pub use vectorstore::VectorIndex;

#[cfg(feature = "openai")]
pub use openai::{OpenAIChatSynthesizer, OpenAIEmbeddingProvider};
