//! Approximate token counting using tiktoken.
//!
//! Counts use the `o200k_base` encoding, which is exact for recent OpenAI
//! models and a reasonable approximation for everything an OpenAI-compatible
//! endpoint might serve. If the encoder fails to initialize the counter
//! falls back to a bytes/4 estimate rather than refusing to run.

use std::sync::OnceLock;

use tiktoken_rs::{CoreBPE, o200k_base};

use spectre_types::ChatMessage;

/// Fixed per-message overhead approximating role markers and delimiters.
const MESSAGE_OVERHEAD_TOKENS: u32 = 4;

/// The encoder loads vocabulary data and is expensive to build; share one
/// instance process-wide.
static ENCODER: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn encoder() -> Option<&'static CoreBPE> {
    ENCODER.get_or_init(|| o200k_base().ok()).as_ref()
}

/// Thread-safe approximate token counter.
#[derive(Clone, Copy, Default)]
pub struct TokenCounter {
    _private: (),
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").finish()
    }
}

impl TokenCounter {
    #[must_use]
    pub fn new() -> Self {
        if encoder().is_none() {
            tracing::warn!(
                "failed to initialize the o200k_base encoder; falling back to byte-length estimates"
            );
        }
        Self { _private: () }
    }

    /// Count tokens in a bare string.
    #[must_use]
    pub fn count_str(&self, text: &str) -> u32 {
        let len = match encoder() {
            Some(enc) => enc.encode_ordinary(text).len(),
            None => text.len().div_ceil(4),
        };
        u32::try_from(len).unwrap_or(u32::MAX)
    }

    /// Count tokens for one message, including role overhead and any tool
    /// call arguments it carries.
    #[must_use]
    pub fn count_message(&self, message: &ChatMessage) -> u32 {
        let mut total = self.count_str(&message.content) + MESSAGE_OVERHEAD_TOKENS;
        for call in &message.tool_calls {
            total = total
                .saturating_add(self.count_str(&call.name))
                .saturating_add(self.count_str(&call.arguments.to_string()));
        }
        total
    }

    /// Estimated total for a whole history.
    #[must_use]
    pub fn count_history(&self, messages: &[ChatMessage]) -> u32 {
        messages
            .iter()
            .map(|m| self.count_message(m))
            .fold(0, u32::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::TokenCounter;
    use spectre_types::ChatMessage;

    #[test]
    fn counts_grow_with_text() {
        let counter = TokenCounter::new();
        let short = counter.count_str("hi");
        let long = counter.count_str("a considerably longer sentence with many words in it");
        assert!(long > short);
    }

    #[test]
    fn message_overhead_is_applied() {
        let counter = TokenCounter::new();
        let msg = ChatMessage::user("hello");
        assert!(counter.count_message(&msg) > counter.count_str("hello"));
    }

    #[test]
    fn empty_string_is_cheap_but_not_free_per_message() {
        let counter = TokenCounter::new();
        assert_eq!(counter.count_str(""), 0);
        assert!(counter.count_message(&ChatMessage::user("")) > 0);
    }
}
