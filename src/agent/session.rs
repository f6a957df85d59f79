// ABOUTME: Per-conversation state: the message history and its compression cache.
// ABOUTME: The agent loop appends to it; the system prompt is not stored here.

use super::compaction::CompressionState;
use crate::message::Message;

/// One conversation with the agent.
#[derive(Debug, Clone, Default)]
pub struct Session {
    messages: Vec<Message>,
    compression: CompressionState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from earlier messages. Placeholder entries are dropped.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: messages.into_iter().filter(|m| !m.pending).collect(),
            compression: CompressionState::default(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn compression(&self) -> &CompressionState {
        &self.compression
    }

    pub(crate) fn compression_mut(&mut self) -> &mut CompressionState {
        &mut self.compression
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Forget the conversation and any cached summary.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.compression.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
