//! Conversation history with token-budget trimming.

use spectre_types::{ChatMessage, Role};

use crate::TokenCounter;

/// Ordered conversation history.
///
/// The first message is the system prompt and survives every trim; older
/// user/assistant/tool traffic is dropped from the front when the estimated
/// token total exceeds the configured input budget.
#[derive(Debug, Default)]
pub struct History {
    messages: Vec<ChatMessage>,
}

impl History {
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop everything but the system prompt.
    pub fn clear(&mut self) {
        self.messages.truncate(1);
    }

    /// Drop oldest non-system messages until the estimate fits `budget`.
    ///
    /// A tool-role message whose assistant request was trimmed away is an
    /// orphan the API will reject, so after trimming the front is advanced
    /// past any leading tool results.
    pub fn trim_to_budget(&mut self, counter: &TokenCounter, budget: u32) {
        let mut dropped = 0usize;
        while self.messages.len() > 2 && counter.count_history(&self.messages) > budget {
            self.messages.remove(1);
            dropped += 1;
            while self.messages.len() > 1 && self.messages[1].role == Role::Tool {
                self.messages.remove(1);
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, remaining = self.messages.len(), "trimmed history");
        }
    }
}
