//! Bounded conversation memory.
//!
//! Memory is session scoped and never persisted; it is dropped with the
//! session that owns it.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One answered question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    /// The user's question.
    pub question: String,
    /// The answer that was returned.
    pub answer: String,
    /// When the question was answered.
    pub asked_at: DateTime<Utc>,
}

impl Turn {
    /// Create a turn stamped with the current time.
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { question: question.into(), answer: answer.into(), asked_at: Utc::now() }
    }
}

/// The most recent `depth` turns, oldest first.
///
/// Appending beyond `depth` evicts the oldest turn.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    depth: usize,
    turns: VecDeque<Turn>,
}

impl ConversationMemory {
    /// Create an empty memory holding at most `depth` turns (minimum 1).
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self { depth, turns: VecDeque::with_capacity(depth) }
    }

    /// Record a turn, evicting the oldest one on overflow.
    pub fn append(&mut self, turn: Turn) {
        if self.turns.len() == self.depth {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// The last `min(n, len)` turns, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Turn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    /// Forget every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Number of turns currently retained.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when no turns are retained.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Maximum number of turns kept.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Iterate over stored turns, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(10)
    }
}
