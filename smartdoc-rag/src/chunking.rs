//! Word-window document chunking.
//!
//! Text is split on whitespace and grouped into windows of `chunk_size` words,
//! each window starting `chunk_size - overlap` words after the previous one.
//! The final window may be shorter; no words are dropped except inside windows
//! discarded as noise (trimmed text shorter than `min_chunk_chars`).

use std::ops::Range;

use tracing::debug;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Largest accepted `chunk_size`, in words.
pub const MAX_CHUNK_WORDS: usize = 2000;

/// Default minimum trimmed chunk length, in characters.
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 10;

/// A strategy for splitting documents into chunks.
///
/// Implementations are pure: the same document always yields the same chunks,
/// with sequence indices assigned in document order.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks. Returns an empty `Vec` for blank text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// One window of words produced by [`WordWindowChunker::split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordWindow {
    /// Word offsets into the source text (end exclusive).
    pub words: Range<usize>,
    /// Byte offsets into the source text (end exclusive).
    pub bytes: Range<usize>,
    /// The source text covered by the window, from its first to its last word.
    pub text: String,
}

/// Splits text into overlapping windows of whole words.
///
/// # Example
///
/// ```rust,ignore
/// use smartdoc_rag::WordWindowChunker;
///
/// let chunker = WordWindowChunker::new(600, 50)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct WordWindowChunker {
    chunk_size: usize,
    overlap: usize,
    min_chunk_chars: usize,
}

impl WordWindowChunker {
    /// Create a chunker producing `chunk_size`-word windows sharing `overlap` words.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if `chunk_size` is zero or above
    /// [`MAX_CHUNK_WORDS`], or if `overlap >= chunk_size` (the window would
    /// never advance).
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_WORDS {
            return Err(RagError::Configuration(format!(
                "chunk_size ({chunk_size}) must be between 1 and {MAX_CHUNK_WORDS} words"
            )));
        }
        if overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap, min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS })
    }

    /// Set the minimum trimmed length below which a window is treated as noise.
    pub fn with_min_chunk_chars(mut self, chars: usize) -> Self {
        self.min_chunk_chars = chars;
        self
    }

    /// Words per window.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Words shared by consecutive windows.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split raw text into word windows.
    pub fn split(&self, text: &str) -> Vec<WordWindow> {
        let spans = word_spans(text);
        let total = spans.len();
        if total == 0 {
            return Vec::new();
        }

        let step = self.chunk_size - self.overlap;
        let mut windows = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(total);
            let bytes = spans[start].start..spans[end - 1].end;
            let window_text = &text[bytes.clone()];

            if window_text.trim().chars().count() >= self.min_chunk_chars {
                windows.push(WordWindow {
                    words: start..end,
                    bytes,
                    text: window_text.to_string(),
                });
            } else {
                debug!(words = ?(start..end), "discarding chunk below minimum length");
            }

            if end >= total {
                break;
            }
            start += step;
        }

        windows
    }
}

impl Chunker for WordWindowChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split(&document.text)
            .into_iter()
            .enumerate()
            .map(|(index, window)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), index.to_string());
                Chunk {
                    id: format!("{}_{index}", document.id),
                    index,
                    document_id: document.id.clone(),
                    text: window.text,
                    words: window.words,
                    bytes: window.bytes,
                    metadata,
                }
            })
            .collect()
    }
}

/// Chunk `text` into overlapping word windows and return their texts.
///
/// # Errors
///
/// Returns [`RagError::Configuration`] when `overlap >= chunk_size` or the
/// chunk size is out of range.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    let chunker = WordWindowChunker::new(chunk_size, overlap)?;
    Ok(chunker.split(text).into_iter().map(|w| w.text).collect())
}

/// Byte ranges of the whitespace-separated words of `text`.
fn word_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut word_start = None;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(start) = word_start.take() {
                spans.push(start..i);
            }
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    if let Some(start) = word_start {
        spans.push(start..text.len());
    }

    spans
}
