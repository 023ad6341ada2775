//! Interactive chat loop.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use smartdoc_rag::{RagError, Session};
use tracing::{debug, warn};

use crate::output;

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput<'a> {
    Question(&'a str),
    Help,
    Stats,
    History,
    Reset,
    Quit,
    Empty,
    Unknown(&'a str),
}

impl<'a> ChatInput<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if !line.starts_with('/') {
            return Self::Question(line);
        }
        match line {
            "/help" | "/?" => Self::Help,
            "/stats" => Self::Stats,
            "/history" => Self::History,
            "/reset" | "/clear" => Self::Reset,
            "/quit" | "/exit" => Self::Quit,
            other => Self::Unknown(other),
        }
    }
}

const HELP: &str = "Type a question, or one of:
  /stats    index statistics
  /history  questions asked so far
  /reset    forget the conversation
  /quit     leave";

/// Run the prompt until `/quit`, Ctrl-D, or Ctrl-C.
pub async fn run(session: &Session) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let document_count = session.stats().await.document_count;
    println!("Chatting about {document_count} document(s). Type /help for commands.");

    loop {
        let line = match editor.readline("smartdoc> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Help => println!("{HELP}"),
            ChatInput::Stats => output::print_stats(&session.stats().await),
            ChatInput::History => {
                for (i, turn) in session.history().await.iter().enumerate() {
                    println!("{:>2}. {}", i + 1, turn.question);
                }
            }
            ChatInput::Reset => {
                session.reset_conversation().await;
                println!("Conversation cleared.");
            }
            ChatInput::Unknown(command) => println!("Unknown command {command}. Type /help."),
            ChatInput::Question(question) => {
                if let Err(e) = editor.add_history_entry(question) {
                    warn!(error = %e, "could not record prompt history");
                }
                match session.ask(question).await {
                    Ok(answer) => output::print_answer(&answer),
                    Err(e) => {
                        debug!(error = %e, "question failed");
                        eprintln!("{}", e.user_message());
                        if matches!(e, RagError::Configuration(_)) {
                            return Err(e.into());
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_questions() {
        assert_eq!(ChatInput::parse("  "), ChatInput::Empty);
        assert_eq!(ChatInput::parse("/quit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse(" /stats "), ChatInput::Stats);
        assert_eq!(ChatInput::parse("/clear"), ChatInput::Reset);
        assert_eq!(ChatInput::parse("/frobnicate"), ChatInput::Unknown("/frobnicate"));
        assert_eq!(ChatInput::parse(" What is new? "), ChatInput::Question("What is new?"));
    }
}
