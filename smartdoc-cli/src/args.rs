//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::logging::LogFormat;

/// Default directory for the persisted index.
pub const DEFAULT_INDEX_DIR: &str = ".smartdoc-index";

/// Ask questions about your documents.
#[derive(Parser, Debug)]
#[command(name = "smartdoc", version, about, long_about = None)]
pub struct Cli {
    /// JSON file with engine settings; flags below override it.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted index.
    #[arg(long, global = true, value_name = "DIR", default_value = DEFAULT_INDEX_DIR)]
    pub index_dir: PathBuf,

    /// Log output format (filter with RUST_LOG).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Per-run overrides of the engine settings.
#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct ConfigOverrides {
    /// Words per chunk.
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Words shared by consecutive chunks.
    #[arg(long, global = true)]
    pub chunk_overlap: Option<usize>,

    /// Maximum passages retrieved per question.
    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    /// Minimum similarity (0 to 1) for a passage to count as relevant.
    #[arg(long, global = true)]
    pub similarity_threshold: Option<f32>,

    /// Character budget for the context handed to the answer model.
    #[arg(long, global = true)]
    pub max_context_chars: Option<usize>,

    /// Conversation turns remembered in chat.
    #[arg(long, global = true)]
    pub memory_depth: Option<usize>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Index text files and save the index.
    Index {
        /// Plain-text or Markdown files to index.
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Add to the saved index instead of replacing it.
        #[arg(long)]
        append: bool,
    },

    /// Answer one question from the saved index.
    Query {
        question: String,

        /// Print the answer and retrieval details as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Chat interactively about the saved index or the given files.
    Chat {
        /// Index these files for this chat instead of loading the saved index.
        #[arg(long = "file", value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Show statistics about the saved index.
    Stats,
}
