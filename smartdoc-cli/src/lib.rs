//! Command-line front end for SmartDoc.
//!
//! This crate provides:
//! - `smartdoc index` to chunk, embed, and save text files
//! - `smartdoc query` for one-off questions against the saved index
//! - `smartdoc chat` for an interactive conversation with memory
//! - `smartdoc stats` to inspect the saved index

pub mod args;
pub mod config;
pub mod documents;
pub mod interrupt;
pub mod logging;
pub mod output;
pub mod providers;
pub mod repl;

use std::path::Path;

use anyhow::Context;
use smartdoc_rag::{RagConfig, RagError, Session};
use tracing::info;

use crate::interrupt::Interrupts;

pub use args::{Cli, Command};

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::load(cli.config.as_deref(), &cli.overrides)?;
    let interrupts = Interrupts::install();

    match cli.command {
        Command::Index { files, append } => {
            let session = new_session(config)?;
            if append && cli.index_dir.exists() {
                session.load_index(&cli.index_dir).await?;
            }
            let documents = documents::read_documents(&files)?;
            let report = interrupts
                .cancellable(|cancel| {
                    let session = &session;
                    async move {
                        if append {
                            session.add_documents(documents, &cancel).await
                        } else {
                            session.ingest(documents, &cancel).await
                        }
                    }
                })
                .await?;
            session.persist_index(&cli.index_dir).await?;
            output::print_ingest(&report);
            info!(index_dir = %cli.index_dir.display(), "index saved");
        }
        Command::Query { question, json } => {
            let session = open_saved(config, &cli.index_dir).await?;
            let answer = session.ask(&question).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                output::print_answer(&answer);
            }
        }
        Command::Chat { files } => {
            let session = if files.is_empty() {
                open_saved(config, &cli.index_dir).await?
            } else {
                let session = new_session(config)?;
                let documents = documents::read_documents(&files)?;
                let report = interrupts
                    .cancellable(|cancel| {
                        let session = &session;
                        async move { session.ingest(documents, &cancel).await }
                    })
                    .await?;
                output::print_ingest(&report);
                session
            };
            repl::run(&session).await?;
        }
        Command::Stats => {
            let session = open_saved(config, &cli.index_dir).await?;
            output::print_stats(&session.stats().await);
        }
    }

    Ok(())
}

fn new_session(config: RagConfig) -> anyhow::Result<Session> {
    let session = Session::builder()
        .config(config)
        .embedding_provider(providers::embedding_provider()?)
        .synthesizer(providers::synthesizer()?)
        .build()?;
    Ok(session)
}

async fn open_saved(config: RagConfig, index_dir: &Path) -> anyhow::Result<Session> {
    let session = new_session(config)?;
    session.load_index(index_dir).await.with_context(|| {
        format!("no usable index in {}; run `smartdoc index <FILES>` first", index_dir.display())
    })?;
    Ok(session)
}

/// Text shown on stderr when a command fails.
///
/// Engine errors are reduced to their [`RagError::user_message`], keeping any
/// hint this crate attached on top; provider responses and internal details
/// are left to the debug log. Other failures show their whole cause chain.
pub fn error_message(err: &anyhow::Error) -> String {
    match err.chain().find_map(|e| e.downcast_ref::<RagError>()) {
        Some(rag) if err.downcast_ref::<RagError>().is_some() => rag.user_message(),
        Some(rag) => format!("{err}\n{}", rag.user_message()),
        None => format!("Error: {err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn engine_errors_hide_provider_details() {
        let err = anyhow::Error::from(RagError::EmbeddingError {
            provider: "OpenAI".into(),
            message: "API returned 401 Unauthorized: invalid key sk-abc".into(),
            transient: false,
        });
        let message = error_message(&err);
        assert_eq!(message, err.downcast_ref::<RagError>().unwrap().user_message());
        assert!(!message.contains("401"));
        assert!(!message.contains("sk-abc"));

        let timeout = anyhow::Error::from(RagError::RetrievalTimeout {
            timeout: Duration::from_secs(30),
        });
        assert!(!error_message(&timeout).contains("30000ms"));
    }

    #[test]
    fn hints_are_kept_above_engine_errors() {
        let err = Err::<(), _>(RagError::index_load("/data/idx/vectors.bin", "bad magic"))
            .context("no usable index in /data/idx; run `smartdoc index <FILES>` first")
            .unwrap_err();
        let message = error_message(&err);
        assert!(message.starts_with("no usable index in /data/idx"));
        assert!(message.contains("Re-index your documents"));
        assert!(!message.contains("bad magic"));
    }

    #[test]
    fn other_errors_show_their_cause_chain() {
        let err = anyhow::anyhow!("permission denied").context("failed to read notes.txt");
        assert_eq!(error_message(&err), "Error: failed to read notes.txt: permission denied");
    }
}
