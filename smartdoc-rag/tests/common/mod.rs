//! Deterministic stand-ins for the embedding and synthesis capabilities.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use smartdoc_rag::{
    AnswerSynthesizer, Chunk, Document, EmbeddingProvider, RagError, Result, Turn,
};
use tokio_util::sync::CancellationToken;

/// `count` distinct words `w0 w1 ...` separated by single spaces.
pub fn numbered_words(count: usize) -> String {
    (0..count).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

/// A chunk with the given position, no metadata, and a dummy span.
pub fn chunk(document_id: &str, index: usize, text: &str) -> Chunk {
    Chunk {
        id: format!("{document_id}_{index}"),
        index,
        document_id: document_id.to_string(),
        text: text.to_string(),
        words: 0..text.split_whitespace().count(),
        bytes: 0..text.len(),
        metadata: HashMap::new(),
    }
}

/// Five short documents about unrelated topics.
pub fn topic_documents() -> Vec<Document> {
    vec![
        Document::new("refunds", "Refunds are issued within five business days of the return."),
        Document::new("shipping", "Shipping is free for orders above fifty dollars worldwide."),
        Document::new("warranty", "The warranty covers manufacturing defects for two years."),
        Document::new("privacy", "Personal data is never sold to third parties or advertisers."),
        Document::new("support", "Support is available by chat every weekday morning."),
    ]
}

/// Embeds text as counts over a fixed vocabulary, so similarities are easy
/// to predict. Words outside the vocabulary are ignored.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    name: String,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self { vocabulary: vocabulary.to_vec(), name: format!("keyword-d{}", vocabulary.len()) }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.vocabulary.len()];
        for token in text.split(|c: char| !c.is_alphanumeric()) {
            let token = token.to_lowercase();
            if let Some(i) = self.vocabulary.iter().position(|w| *w == token) {
                vector[i] += 1.0;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wraps another embedder and sleeps before every call.
pub struct SlowEmbedder<E> {
    pub inner: E,
    pub delay: Duration,
}

#[async_trait]
impl<E: EmbeddingProvider> EmbeddingProvider for SlowEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Sleeps longer for earlier calls, so batches issued first finish last.
pub struct ReverseDelayEmbedder<E> {
    pub inner: E,
    pub expected_calls: usize,
    calls: AtomicUsize,
}

impl<E> ReverseDelayEmbedder<E> {
    pub fn new(inner: E, expected_calls: usize) -> Self {
        Self { inner, expected_calls, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl<E: EmbeddingProvider> EmbeddingProvider for ReverseDelayEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.expected_calls.saturating_sub(call) as u64;
        tokio::time::sleep(Duration::from_millis(10 * remaining)).await;
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Fails the first `failures` batch calls with a transient error.
pub struct FlakyEmbedder<E> {
    pub inner: E,
    failures: usize,
    pub calls: AtomicUsize,
}

impl<E> FlakyEmbedder<E> {
    pub fn new(inner: E, failures: usize) -> Self {
        Self { inner, failures, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl<E: EmbeddingProvider> EmbeddingProvider for FlakyEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text]).await?;
        Ok(batch.remove(0))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(RagError::transient_embedding("flaky", "429 Too Many Requests"));
        }
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Fails permanently on any text containing `poison`.
pub struct PoisonEmbedder<E> {
    pub inner: E,
}

#[async_trait]
impl<E: EmbeddingProvider> EmbeddingProvider for PoisonEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("poison") {
            return Err(RagError::embedding("poison", "model rejected input"));
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Cancels `token` while serving batch call number `cancel_on` (0-based).
pub struct CancellingEmbedder<E> {
    pub inner: E,
    pub token: CancellationToken,
    pub cancel_on: usize,
    pub calls: AtomicUsize,
}

impl<E> CancellingEmbedder<E> {
    pub fn new(inner: E, token: CancellationToken, cancel_on: usize) -> Self {
        Self { inner, token, cancel_on, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl<E: EmbeddingProvider> EmbeddingProvider for CancellingEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.cancel_on {
            self.token.cancel();
        }
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// One recorded `generate` call.
#[derive(Debug, Clone)]
pub struct SynthesisCall {
    pub question: String,
    pub context: String,
    pub history: Vec<Turn>,
}

/// Records every call and answers with a reasoning preamble that the
/// session is expected to strip.
#[derive(Default)]
pub struct RecordingSynthesizer {
    pub calls: Mutex<Vec<SynthesisCall>>,
    transient_failures: AtomicUsize,
}

impl RecordingSynthesizer {
    /// Fail the first `failures` calls with a transient error.
    pub fn flaky(failures: usize) -> Self {
        Self { calls: Mutex::new(Vec::new()), transient_failures: AtomicUsize::new(failures) }
    }

    pub fn calls(&self) -> Vec<SynthesisCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerSynthesizer for RecordingSynthesizer {
    async fn generate(&self, question: &str, context: &str, history: &[Turn]) -> Result<String> {
        self.calls.lock().unwrap().push(SynthesisCall {
            question: question.to_string(),
            context: context.to_string(),
            history: history.to_vec(),
        });
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RagError::SynthesisError {
                provider: "recording".into(),
                message: "503 Service Unavailable".into(),
                transient: true,
            });
        }
        Ok(format!("<think>looking it up</think>\n\nAnswer to: {question}"))
    }
}
