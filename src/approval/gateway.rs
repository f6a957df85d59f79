// ABOUTME: Confirmation gateway: how the agent loop asks a human to approve a risky tool call.
// ABOUTME: ChannelGateway forwards requests over mpsc with a oneshot responder for the answer.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::types::ApprovalDecision;
use crate::message::ToolCall;

/// Asks for a decision on a tool call classified as needs-confirmation.
///
/// Implementations may wait indefinitely; the loop imposes no timeout.
#[async_trait]
pub trait ConfirmationGateway: Send + Sync {
    async fn request_approval(&self, call: &ToolCall, description: &str) -> ApprovalDecision;
}

/// An approval request waiting for the user.
#[derive(Debug)]
pub struct PendingApproval {
    pub tool_call: ToolCall,
    /// What will actually run, e.g. the shell command.
    pub description: String,
    pub responder: oneshot::Sender<ApprovalDecision>,
}

impl PendingApproval {
    /// Answer the request. A receiver that has gone away is ignored.
    pub fn respond(self, decision: ApprovalDecision) {
        let _ = self.responder.send(decision);
    }
}

/// Gateway that hands requests to whoever holds the receiving end.
#[derive(Clone)]
pub struct ChannelGateway {
    tx: mpsc::Sender<PendingApproval>,
}

impl ChannelGateway {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PendingApproval>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ConfirmationGateway for ChannelGateway {
    async fn request_approval(&self, call: &ToolCall, description: &str) -> ApprovalDecision {
        let (responder, rx) = oneshot::channel();
        let pending = PendingApproval {
            tool_call: call.clone(),
            description: description.to_string(),
            responder,
        };
        if self.tx.send(pending).await.is_err() {
            debug!(tool = %call.name, "approval receiver closed, denying");
            return ApprovalDecision::Denied;
        }
        // Responder dropped without an answer: treat as deny.
        rx.await.unwrap_or(ApprovalDecision::Denied)
    }
}
