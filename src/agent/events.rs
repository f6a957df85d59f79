// ABOUTME: Progress notifications emitted by the agent loop while a turn runs.
// ABOUTME: Delivered fire-and-forget over an unbounded channel; a closed receiver is ignored.

use tokio::sync::mpsc;

use crate::approval::SafetyLevel;
use crate::message::Message;

/// Something observable happened during a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// A fragment of the model's reasoning text.
    ReasoningDelta(String),
    /// A fragment of the model's reply.
    ContentDelta(String),
    /// A tool is about to be dispatched.
    ToolCallStarted {
        tool_name: String,
        command: String,
        safety: SafetyLevel,
    },
    /// A line of output from a running tool.
    ToolOutput(String),
    /// A message was added to the conversation.
    MessageAppended(Message),
    /// The request history was shrunk before sending.
    ContextCompressed { old_count: usize, new_count: usize },
}

/// Optional sender; every send is best-effort.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops everything.
    pub fn none() -> Self {
        Self { tx: None }
    }

    pub fn is_connected(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    pub fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
