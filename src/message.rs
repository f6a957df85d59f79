// ABOUTME: Conversation data model: messages, tool calls, streaming deltas, and reduced responses.
// ABOUTME: Messages are append-only; tool calls and outputs live only on command-role messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// A tool invocation together with its result.
    Command,
    System,
}

/// A structured function invocation issued by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier assigned by the backend, unique within a turn.
    pub id: String,
    pub name: String,
    /// Raw JSON argument text exactly as streamed.
    pub arguments: String,
    /// Human-readable description of what the call does.
    pub explanation: String,
}

impl ToolCall {
    /// Build a tool call, deriving the explanation from the arguments.
    ///
    /// Uses an `explanation` string argument when the model supplied one,
    /// otherwise a truncated `name(arguments)` summary.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        let name = name.into();
        let arguments = arguments.into();
        let explanation = serde_json::from_str::<serde_json::Value>(&arguments)
            .ok()
            .and_then(|v| {
                v.get("explanation")
                    .and_then(|e| e.as_str())
                    .map(str::to_string)
            })
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| format!("{}({})", name, summarize_arguments(&arguments)));
        Self {
            id: id.into(),
            name,
            arguments,
            explanation,
        }
    }
}

/// Truncate raw arguments for display to 80 characters.
pub fn summarize_arguments(arguments: &str) -> String {
    let truncated: String = arguments.chars().take(80).collect();
    if truncated.len() < arguments.len() {
        format!("{}...", truncated)
    } else {
        arguments.to_string()
    }
}

/// A single conversation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Placeholder for a reply still being produced; never sent or counted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call: None,
            tool_output: None,
            reasoning: None,
            timestamp: Utc::now(),
            pending: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// An assistant reply carrying optional reasoning text.
    pub fn assistant_with_reasoning(content: impl Into<String>, reasoning: Option<String>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.reasoning = reasoning.filter(|r| !r.is_empty());
        msg
    }

    /// A tool invocation and its textual result. The content mirrors the explanation.
    pub fn command(call: ToolCall, output: impl Into<String>, reasoning: Option<String>) -> Self {
        let mut msg = Self::new(Role::Command, call.explanation.clone());
        msg.tool_call = Some(call);
        msg.tool_output = Some(output.into());
        msg.reasoning = reasoning.filter(|r| !r.is_empty());
        msg
    }

    /// A placeholder entry for an in-flight reply.
    pub fn placeholder() -> Self {
        let mut msg = Self::new(Role::Assistant, "");
        msg.pending = true;
        msg
    }
}

/// One incremental event parsed from the backend's event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamingDelta {
    Reasoning(String),
    Content(String),
    ToolCall(ToolCall),
    Done,
    Error(String),
}

/// The reduced form of a complete delta stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentResponse {
    Text {
        text: String,
        reasoning: Option<String>,
    },
    ToolCalls {
        calls: Vec<ToolCall>,
        reasoning: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explanation_prefers_argument() {
        let call = ToolCall::new(
            "call-1",
            "run_command",
            r#"{"command":"df -h","explanation":"Check disk usage"}"#,
        );
        assert_eq!(call.explanation, "Check disk usage");
    }

    #[test]
    fn explanation_falls_back_to_summary() {
        let call = ToolCall::new("call-1", "get_system_info", r#"{"category":"disk"}"#);
        assert_eq!(call.explanation, r#"get_system_info({"category":"disk"})"#);
    }

    #[test]
    fn long_arguments_are_truncated() {
        let long = format!(r#"{{"command":"{}"}}"#, "x".repeat(200));
        let summary = summarize_arguments(&long);
        assert!(summary.len() <= 83);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn only_command_messages_carry_tool_fields() {
        let user = Message::user("hi");
        assert!(user.tool_call.is_none() && user.tool_output.is_none());

        let call = ToolCall::new("c", "read_file", r#"{"path":"/etc/hosts"}"#);
        let cmd = Message::command(call.clone(), "127.0.0.1 localhost", None);
        assert_eq!(cmd.role, Role::Command);
        assert_eq!(cmd.tool_call.as_ref(), Some(&call));
        assert_eq!(cmd.tool_output.as_deref(), Some("127.0.0.1 localhost"));
    }

    #[test]
    fn empty_reasoning_is_dropped() {
        let msg = Message::assistant_with_reasoning("done", Some(String::new()));
        assert!(msg.reasoning.is_none());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Command).unwrap();
        assert_eq!(json, "\"command\"");
    }

    #[test]
    fn placeholder_flag_skipped_when_false() {
        let json = serde_json::to_value(Message::user("x")).unwrap();
        assert!(json.get("pending").is_none());
        let json = serde_json::to_value(Message::placeholder()).unwrap();
        assert_eq!(json["pending"], true);
    }
}
