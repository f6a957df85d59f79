// ABOUTME: RunCommand tool: runs an arbitrary shell command on the managed host.
// ABOUTME: Safety comes from the command policy; output is streamed line by line.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolArguments, ToolContext};
use crate::approval::{CommandPolicy, SafetyLevel};
use crate::error::{ExecutionError, ToolDispatchError};

pub const RUN_COMMAND_TOOL_NAME: &str = "run_command";

/// Upper bound on a model-requested timeout.
const MAX_TIMEOUT_SECONDS: u64 = 600;

#[derive(Debug, Deserialize)]
struct RunCommandArgs {
    command: String,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

/// Generic command tool, gated by [`CommandPolicy`].
pub struct RunCommandTool {
    policy: CommandPolicy,
}

impl RunCommandTool {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            policy: CommandPolicy::new()?,
        })
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        RUN_COMMAND_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Run a shell command on the managed host and return its output. Prefer the specialized \
         tools when one fits. Read-only commands run immediately; anything that changes the \
         system asks the user first, and destructive commands are refused."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to run"
                },
                "explanation": {
                    "type": "string",
                    "description": "One sentence telling the user what this command does"
                },
                "timeout_seconds": {
                    "type": "integer",
                    "description": "Override the default timeout for long-running commands"
                }
            },
            "required": ["command"]
        })
    }

    fn classify(&self, args: &ToolArguments) -> SafetyLevel {
        match args.str("command") {
            Some(command) => self.policy.classify(command),
            None => SafetyLevel::NeedsConfirmation,
        }
    }

    fn build_command(&self, args: &ToolArguments) -> Result<String, ToolDispatchError> {
        let args: RunCommandArgs = args.decode()?;
        if args.command.trim().is_empty() {
            return Err(ToolDispatchError::InvalidArguments(
                "'command' must not be empty".to_string(),
            ));
        }
        Ok(args.command)
    }

    async fn execute(
        &self,
        command: &str,
        args: &ToolArguments,
        ctx: &ToolContext<'_>,
    ) -> Result<String, ExecutionError> {
        let timeout = args
            .u64("timeout_seconds")
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(secs.min(MAX_TIMEOUT_SECONDS)))
            .unwrap_or(ctx.timeout);
        ctx.run_with_timeout(command, timeout).await
    }
}
