//! Data types for documents, chunks, and search results.

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Already-extracted text of one source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The decoded text content of the document.
    pub text: String,
    /// Key-value metadata from the extractor (page numbers, file name, ...).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach the URI of the original source.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// A contiguous word span of a [`Document`], the unit of indexing and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{document_id}_{index}`.
    pub id: String,
    /// Sequence index within the parent document.
    pub index: usize,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// The chunk text.
    pub text: String,
    /// Word offsets into the parent document (end exclusive).
    pub words: Range<usize>,
    /// Byte offsets into the parent document text (end exclusive).
    pub bytes: Range<usize>,
    /// Metadata inherited from the parent document plus `chunk_index`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A retrieved [`Chunk`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}
