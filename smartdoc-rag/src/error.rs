//! Error types for the `smartdoc-rag` crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while ingesting documents or answering questions.
///
/// "Nothing relevant found" is deliberately absent: it is reported through
/// [`RetrievalStatus::NoRelevantContent`](crate::retriever::RetrievalStatus)
/// rather than as a failure.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid chunking, retrieval, or session parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller supplied unusable input (for example a blank question).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The embedding capability failed or returned malformed output.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether the failure is transient (rate limit, network blip).
        transient: bool,
    },

    /// A persisted index is missing or corrupt and must be rebuilt from source.
    #[error("Failed to load index from {}: {message}", path.display())]
    IndexLoad {
        /// The index directory or artifact that could not be read.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// Writing an index to durable storage failed.
    #[error("Failed to persist index to {}: {message}", path.display())]
    Persist {
        /// The artifact being written.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// A query exceeded its deadline.
    #[error("Retrieval timed out after {}ms", timeout.as_millis())]
    RetrievalTimeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The answer synthesizer failed.
    #[error("Synthesis error ({provider}): {message}")]
    SynthesisError {
        /// The synthesizer that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether the failure is transient (rate limit, timeout, 5xx).
        transient: bool,
    },

    /// An index build was cancelled before completion.
    #[error("Index build cancelled")]
    Cancelled,
}

impl RagError {
    /// Build a permanent embedding error.
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingError {
            provider: provider.into(),
            message: message.into(),
            transient: false,
        }
    }

    /// Build a transient embedding error that is worth retrying.
    pub fn transient_embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.into(), message: message.into(), transient: true }
    }

    /// Build an index load error for `path`.
    pub fn index_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IndexLoad { path: path.into(), message: message.into() }
    }

    /// Whether retrying the failed call can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EmbeddingError { transient, .. } | Self::SynthesisError { transient, .. } => {
                *transient
            }
            Self::RetrievalTimeout { .. } => true,
            Self::Configuration(_)
            | Self::InvalidInput(_)
            | Self::IndexLoad { .. }
            | Self::Persist { .. }
            | Self::Cancelled => false,
        }
    }

    /// Short, actionable text suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(detail) => format!("The settings are invalid: {detail}."),
            Self::InvalidInput(detail) => format!("Please check your input: {detail}."),
            Self::EmbeddingError { transient: true, .. } => {
                "The embedding service is temporarily unavailable. Please try again in a moment."
                    .to_string()
            }
            Self::EmbeddingError { .. } => {
                "The embedding service could not process the text. Check the embedding provider settings."
                    .to_string()
            }
            Self::IndexLoad { .. } => {
                "The saved document index could not be read. Re-index your documents to continue."
                    .to_string()
            }
            Self::Persist { .. } => {
                "The document index could not be saved. Check that the index directory is writable."
                    .to_string()
            }
            Self::RetrievalTimeout { .. } => {
                "Searching your documents took too long. Please try again.".to_string()
            }
            Self::SynthesisError { transient: true, .. } => {
                "The answer service is busy right now. Please try again shortly.".to_string()
            }
            Self::SynthesisError { .. } => {
                "The answer service rejected the request. Check the API key and model settings."
                    .to_string()
            }
            Self::Cancelled => {
                "Indexing was cancelled; the previous index is still active.".to_string()
            }
        }
    }
}

/// A convenience result type for retrieval engine operations.
pub type Result<T> = std::result::Result<T, RagError>;
