// ABOUTME: Typed errors for the agent runtime: turn-fatal, dispatch, and execution failures.
// ABOUTME: Only AgentError escapes a turn; the other kinds are folded into tool results.

use std::time::Duration;

use thiserror::Error;

/// Failures that terminate a conversation turn.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Required settings are missing (e.g. no API key).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request could not be delivered or the stream could not be opened.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status after all retries.
    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Tool registry construction failed.
    #[error("tool registry error: {0}")]
    Registry(String),
}

impl AgentError {
    /// Whether the error happened while building the request rather than talking to the backend.
    pub fn is_configuration(&self) -> bool {
        matches!(self, AgentError::Configuration(_))
    }
}

/// Failures resolving a tool call before anything runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolDispatchError {
    #[error("unknown tool '{0}'")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Failures raised by a command executor while running a command.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("command timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("command exited with status {code}: {output}")]
    NonZeroExit { code: i32, output: String },

    #[error("failed to start command: {0}")]
    Spawn(String),

    #[error("i/o error while running command: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_mentions_status_and_body() {
        let err = AgentError::Http {
            status: 400,
            body: "bad request".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("bad request"));
    }

    #[test]
    fn timeout_reports_seconds() {
        let err = ExecutionError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "command timed out after 30s");
    }

    #[test]
    fn configuration_is_detected() {
        assert!(AgentError::Configuration("no key".into()).is_configuration());
        assert!(!AgentError::Transport("reset".into()).is_configuration());
    }
}
