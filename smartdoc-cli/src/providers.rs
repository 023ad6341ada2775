//! Choosing the embedding and answer backends.
//!
//! With the `openai` feature the CLI talks to hosted models when API keys are
//! present in the environment (or a `.env` file):
//!
//! - `OPENAI_API_KEY` enables OpenAI embeddings and, unless a Perplexity key
//!   is set, OpenAI chat completions
//! - `PERPLEXITY_API_KEY` answers with Perplexity's `sonar` model
//! - `SMARTDOC_CHAT_MODEL` and `SMARTDOC_EMBEDDING_MODEL` override model names
//!
//! Otherwise everything runs offline with the hashing embedder and the
//! extractive synthesizer.

use std::sync::Arc;

use smartdoc_rag::{
    AnswerSynthesizer, EmbeddingProvider, ExtractiveSynthesizer, HashingEmbeddingProvider,
};
use tracing::info;

/// Dimensions of the offline hashing embedder.
pub const OFFLINE_DIMENSIONS: usize = 384;

#[cfg(feature = "openai")]
const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";

#[cfg(feature = "openai")]
const PERPLEXITY_MODEL: &str = "sonar";

/// The embedder for both indexing and queries.
///
/// An index can only be queried with the embedder that built it, so the
/// choice must not change between `index` and `query` runs.
pub fn embedding_provider() -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    #[cfg(feature = "openai")]
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        let mut provider = smartdoc_rag::OpenAIEmbeddingProvider::new(key)?;
        if let Ok(model) = std::env::var("SMARTDOC_EMBEDDING_MODEL") {
            provider = provider.with_model(model);
        }
        info!(embedder = provider.name(), "using hosted embeddings");
        return Ok(Arc::new(provider));
    }

    let provider = HashingEmbeddingProvider::new(OFFLINE_DIMENSIONS);
    info!(embedder = provider.name(), "using offline embeddings");
    Ok(Arc::new(provider))
}

/// The answer backend.
pub fn synthesizer() -> anyhow::Result<Arc<dyn AnswerSynthesizer>> {
    #[cfg(feature = "openai")]
    {
        use smartdoc_rag::OpenAIChatSynthesizer;

        let chat_model = std::env::var("SMARTDOC_CHAT_MODEL").ok();
        if let Ok(key) = std::env::var("PERPLEXITY_API_KEY") {
            let model = chat_model.unwrap_or_else(|| PERPLEXITY_MODEL.to_string());
            info!(%model, "answering with Perplexity");
            let synthesizer = OpenAIChatSynthesizer::new(key)?
                .with_base_url(PERPLEXITY_BASE_URL)
                .with_model(model);
            return Ok(Arc::new(synthesizer));
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            let mut synthesizer = OpenAIChatSynthesizer::new(key)?;
            if let Some(model) = chat_model {
                synthesizer = synthesizer.with_model(model);
            }
            info!("answering with OpenAI chat completions");
            return Ok(Arc::new(synthesizer));
        }
    }

    info!("no answer model configured; answering with the best matching passage");
    Ok(Arc::new(ExtractiveSynthesizer))
}
