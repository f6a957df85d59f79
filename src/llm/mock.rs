// ABOUTME: Scripted chat backend that replays canned delta sequences and records each request.
// ABOUTME: Used by unit and integration tests to drive the agent loop without a network.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use super::client::{ChatBackend, DeltaStream};
use crate::error::AgentError;
use crate::message::{Message, StreamingDelta, ToolCall};
use crate::tools::ToolSpec;

/// What the backend was asked, captured per call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// A mock backend that returns pre-configured delta sequences in order.
///
/// Once the script runs out, every further call yields an empty text reply.
#[derive(Clone, Default)]
pub struct MockBackend {
    responses: Arc<Mutex<Vec<Vec<StreamingDelta>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn new(responses: Vec<Vec<StreamingDelta>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::default(),
        }
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn stream_chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<DeltaStream, AgentError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            });
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut r| (!r.is_empty()).then(|| r.remove(0)))
            .unwrap_or_else(|| vec![StreamingDelta::Done]);
        Ok(Box::pin(stream::iter(next)))
    }
}

/// A plain text reply split into two content chunks.
pub fn text_reply(text: &str) -> Vec<StreamingDelta> {
    let mid = text
        .char_indices()
        .nth(text.chars().count() / 2)
        .map(|(i, _)| i)
        .unwrap_or(0);
    vec![
        StreamingDelta::Content(text[..mid].to_string()),
        StreamingDelta::Content(text[mid..].to_string()),
        StreamingDelta::Done,
    ]
}

/// A reply consisting of a single tool call.
pub fn tool_call_reply(id: &str, name: &str, arguments: &str) -> Vec<StreamingDelta> {
    vec![
        StreamingDelta::ToolCall(ToolCall::new(id, name, arguments)),
        StreamingDelta::Done,
    ]
}
