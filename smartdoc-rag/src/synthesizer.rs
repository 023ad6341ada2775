//! The answer-generation boundary.
//!
//! The engine never generates text itself. It hands the question, the
//! assembled context, and recent turns to an [`AnswerSynthesizer`], and
//! cleans whatever comes back.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::memory::Turn;
use crate::retriever::{CONTEXT_DELIMITER, NO_RELEVANT_CONTENT};

/// Generates a natural-language answer grounded in retrieved context.
///
/// Implementations typically call a hosted language model and should report
/// rate limits and timeouts as transient
/// [`SynthesisError`](crate::RagError::SynthesisError)s so callers can retry.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    /// Answer `question` from `context`, continuing the conversation in `history`.
    async fn generate(&self, question: &str, context: &str, history: &[Turn]) -> Result<String>;
}

/// Speaker of a [`PromptMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions framing the conversation.
    System,
    /// The person asking.
    User,
    /// The model's earlier replies.
    Assistant,
}

/// One chat message sent to a language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Who the message is from.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl PromptMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Instructions given to the model ahead of every conversation.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions using the provided document context.
Rules:
- Only use information from the \"Context from document\" section.
- If the context does not contain the answer, say so clearly.
- Be specific and refer to the relevant parts of the document.
- Do not include <think> tags or reasoning steps in your response.
- When asked, summarise the conversation so far.";

/// Build the chat messages for one question.
///
/// Prior turns become alternating user/assistant messages; the final user
/// message carries the context (or the "no relevant context" marker when
/// `context` is blank) followed by the question.
pub fn build_messages(question: &str, context: &str, history: &[Turn]) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(PromptMessage::new(Role::System, SYSTEM_PROMPT));

    for turn in history {
        messages.push(PromptMessage::new(Role::User, turn.question.clone()));
        messages.push(PromptMessage::new(Role::Assistant, turn.answer.clone()));
    }

    let context = if context.trim().is_empty() { NO_RELEVANT_CONTENT } else { context };
    messages.push(PromptMessage::new(
        Role::User,
        format!(
            "Context from document:\n{context}\n\nQuestion: {question}\n\nProvide a clean, direct response without showing thinking steps."
        ),
    ));
    messages
}

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid regex"));
static THINKING_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\[THINKING\].*?\[/THINKING\]").expect("valid regex"));
static THINKING_PREAMBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)Let me think about this.*?\n\n").expect("valid regex"));
static EXTRA_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").expect("valid regex"));

/// Strip reasoning artifacts from a model response.
///
/// Removes `<think>` blocks, `[THINKING]` sections and "Let me think about
/// this" preambles, collapses runs of blank lines, and trims.
pub fn clean_response(response: &str) -> String {
    let cleaned = THINK_BLOCK.replace_all(response, "");
    let cleaned = THINKING_SECTION.replace_all(&cleaned, "");
    let cleaned = THINKING_PREAMBLE.replace_all(&cleaned, "");
    let cleaned = EXTRA_BLANK_LINES.replace_all(&cleaned, "\n\n");
    cleaned.trim().to_string()
}

/// Offline synthesizer that answers with the best-ranked passage.
///
/// Useful when no language model is configured and as a deterministic
/// stand-in in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveSynthesizer;

/// Reply used by [`ExtractiveSynthesizer`] when there is no context.
pub const NOT_FOUND_ANSWER: &str = "I could not find anything relevant to that question in the uploaded documents.";

#[async_trait]
impl AnswerSynthesizer for ExtractiveSynthesizer {
    async fn generate(&self, _question: &str, context: &str, _history: &[Turn]) -> Result<String> {
        let top_passage = context.split(CONTEXT_DELIMITER).next().unwrap_or_default().trim();
        if top_passage.is_empty() || top_passage == NO_RELEVANT_CONTENT {
            return Ok(NOT_FOUND_ANSWER.to_string());
        }
        Ok(format!("From the document:\n\n{top_passage}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_thinking_artifacts() {
        let raw = "<think>first I will consider\nthe options</think>\n\n\n\nThe answer is 42.\n[THINKING]hidden[/THINKING]";
        assert_eq!(clean_response(raw), "The answer is 42.");
    }

    #[test]
    fn removes_think_preamble_case_insensitively() {
        let raw = "let me think about this carefully.\n\nRefunds take 5 days.";
        assert_eq!(clean_response(raw), "Refunds take 5 days.");
    }

    #[test]
    fn messages_carry_history_and_marker() {
        let history = vec![Turn::new("What is X?", "X is a thing.")];
        let messages = build_messages("And Y?", "", &history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1], PromptMessage::new(Role::User, "What is X?"));
        assert_eq!(messages[2], PromptMessage::new(Role::Assistant, "X is a thing."));
        assert!(messages[3].content.contains(NO_RELEVANT_CONTENT));
        assert!(messages[3].content.contains("Question: And Y?"));
    }

    #[tokio::test]
    async fn extractive_answers_with_top_passage() {
        let context = format!("alpha passage{CONTEXT_DELIMITER}beta passage");
        let answer = ExtractiveSynthesizer.generate("q", &context, &[]).await.unwrap();
        assert!(answer.contains("alpha passage"));
        assert!(!answer.contains("beta passage"));

        let answer = ExtractiveSynthesizer.generate("q", NO_RELEVANT_CONTENT, &[]).await.unwrap();
        assert_eq!(answer, NOT_FOUND_ANSWER);
    }
}
