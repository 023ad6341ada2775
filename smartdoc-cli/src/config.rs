//! Engine settings: JSON file, then command-line overrides, validated once.

use std::fs;
use std::path::Path;

use anyhow::Context;
use smartdoc_rag::RagConfig;

use crate::args::ConfigOverrides;

/// Resolve the effective [`RagConfig`].
///
/// Keys missing from the file keep their defaults.
pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> anyhow::Result<RagConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => RagConfig::default(),
    };

    apply(&mut config, overrides);
    config.validate()?;
    Ok(config)
}

fn apply(config: &mut RagConfig, overrides: &ConfigOverrides) {
    if let Some(v) = overrides.chunk_size {
        config.chunk_size = v;
    }
    if let Some(v) = overrides.chunk_overlap {
        config.chunk_overlap = v;
    }
    if let Some(v) = overrides.top_k {
        config.top_k = v;
    }
    if let Some(v) = overrides.similarity_threshold {
        config.similarity_threshold = v;
    }
    if let Some(v) = overrides.max_context_chars {
        config.max_context_chars = v;
    }
    if let Some(v) = overrides.memory_depth {
        config.memory_depth = v;
    }
}
