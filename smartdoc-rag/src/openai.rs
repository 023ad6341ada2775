//! OpenAI-compatible embedding and chat-completion adapters.
//!
//! This module is only available when the `openai` feature is enabled. Both
//! adapters accept a base URL so they work against any OpenAI-compatible
//! endpoint (OpenAI, Perplexity, local gateways).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::memory::Turn;
use crate::synthesizer::{AnswerSynthesizer, PromptMessage, build_messages, clean_response};

/// The default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Embedding model used unless overridden.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Native vector length of [`DEFAULT_EMBEDDING_MODEL`].
const DEFAULT_DIMENSIONS: usize = 1536;

/// The default chat model.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Request timeout for chat completions.
const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Whether an HTTP status is worth retrying.
fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Read an unsuccessful response into `(transient, message)`.
async fn describe_failure(response: reqwest::Response) -> (bool, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    (is_transient_status(status), format!("API returned {status}: {detail}"))
}

// ── Embeddings ─────────────────────────────────────────────────────

/// Embeds chunk batches through an OpenAI-compatible `/embeddings` endpoint.
///
/// The provider name encodes model and vector length
/// (`openai:text-embedding-3-small:d1536`), so an index saved with one model
/// is refused when loaded by a session configured with another.
///
/// # Example
///
/// ```rust,ignore
/// use smartdoc_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::from_env()?.with_dimensions(512);
/// let vectors = provider.embed_batch(&["refund policy", "shipping times"]).await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    name: String,
    dimensions: usize,
    /// Sent as `dimensions` so the API shortens its vectors.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Provider for `text-embedding-3-small` at 1536 dimensions.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::embedding("OpenAI", "API key must not be empty"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            name: embedding_name(DEFAULT_EMBEDDING_MODEL, DEFAULT_DIMENSIONS),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Provider keyed from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| {
                RagError::embedding("OpenAI", "OPENAI_API_KEY environment variable not set")
            })?;
        Self::new(api_key)
    }

    /// Set the API base URL (without the `/embeddings` suffix).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use another embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self.name = embedding_name(&self.model, self.dimensions);
        self
    }

    /// Request `dims`-long vectors from models that support shortening.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self.name = embedding_name(&self.model, dims);
        self
    }
}

fn embedding_name(model: &str, dimensions: usize) -> String {
    format!("openai:{model}:d{dimensions}")
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "OpenAI", chars = text.chars().count(), "embedding query");

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding("OpenAI", "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "OpenAI",
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "request failed");
                RagError::transient_embedding("OpenAI", format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let (transient, message) = describe_failure(response).await;
            error!(provider = "OpenAI", transient, %message, "API error");
            return Err(RagError::EmbeddingError { provider: "OpenAI".into(), message, transient });
        }

        let mut embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse response");
            RagError::embedding("OpenAI", format!("failed to parse response: {e}"))
        })?;

        // The API may return items out of input order.
        embedding_response.data.sort_by_key(|d| d.index);
        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// An [`AnswerSynthesizer`] backed by an OpenAI-compatible
/// `/chat/completions` endpoint.
///
/// Sampling is kept conservative (temperature 0.1, top_p 0.9, 1000 tokens)
/// so answers stay close to the supplied context.
pub struct OpenAIChatSynthesizer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIChatSynthesizer {
    /// Create a synthesizer with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(synthesis_error(false, "API key must not be empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()
            .map_err(|e| synthesis_error(false, format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: OPENAI_BASE_URL.into(),
            model: DEFAULT_CHAT_MODEL.into(),
        })
    }

    /// Create a synthesizer using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| synthesis_error(false, "OPENAI_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    /// Set the API base URL (without the `/chat/completions` suffix).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the chat model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

fn synthesis_error(transient: bool, message: impl Into<String>) -> RagError {
    RagError::SynthesisError { provider: "OpenAI".into(), message: message.into(), transient }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl AnswerSynthesizer for OpenAIChatSynthesizer {
    async fn generate(&self, question: &str, context: &str, history: &[Turn]) -> Result<String> {
        let messages = build_messages(question, context, history);
        debug!(
            provider = "OpenAI",
            model = %self.model,
            message_count = messages.len(),
            "requesting completion"
        );

        let request_body = ChatRequest {
            model: &self.model,
            messages: &messages,
            max_tokens: 1000,
            temperature: 0.1,
            top_p: 0.9,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "completion request failed");
                synthesis_error(true, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let (transient, message) = describe_failure(response).await;
            error!(provider = "OpenAI", transient, %message, "completion API error");
            return Err(synthesis_error(transient, message));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse completion");
            synthesis_error(false, format!("failed to parse response: {e}"))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| synthesis_error(false, "API returned no choices"))?;

        Ok(clean_response(&content))
    }
}
