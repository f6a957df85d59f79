// ABOUTME: Core safety types: per-call safety levels and the user's approval decision.
// ABOUTME: SafetyLevel comes from a tool's classifier; ApprovalDecision from the confirmation gateway.

use serde::{Deserialize, Serialize};

/// How a single tool invocation must be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    /// Execute without asking.
    Safe,
    /// Suspend until the user approves or denies.
    NeedsConfirmation,
    /// Never execute.
    Forbidden,
}

/// The user's decision on an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Denied,
}
