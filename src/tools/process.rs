// ABOUTME: ManageProcess tool: send a signal to a process by pid.
// ABOUTME: Mutating, so every call needs the user's confirmation.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolArguments};
use crate::approval::SafetyLevel;
use crate::error::ToolDispatchError;

#[derive(Debug, Deserialize)]
struct ManageProcessArgs {
    pid: u32,
    #[serde(default = "default_signal")]
    signal: String,
}

fn default_signal() -> String {
    "TERM".to_string()
}

pub struct ManageProcessTool;

#[async_trait]
impl Tool for ManageProcessTool {
    fn name(&self) -> &str {
        "manage_process"
    }

    fn description(&self) -> &str {
        "Send a signal to a process (TERM by default, KILL to force). Requires user approval."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pid": {"type": "integer", "description": "Process id"},
                "signal": {"type": "string", "enum": ["TERM", "KILL", "HUP", "INT", "STOP", "CONT"]},
                "explanation": {"type": "string", "description": "Why the process is being signalled"}
            },
            "required": ["pid"]
        })
    }

    fn classify(&self, _args: &ToolArguments) -> SafetyLevel {
        SafetyLevel::NeedsConfirmation
    }

    fn build_command(&self, args: &ToolArguments) -> Result<String, ToolDispatchError> {
        let args: ManageProcessArgs = args.decode()?;
        // pid 0 and 1 would signal the process group or init.
        if args.pid <= 1 {
            return Err(ToolDispatchError::InvalidArguments(format!(
                "refusing to signal pid {}",
                args.pid
            )));
        }
        Ok(format!("kill -s {} {}", args.signal, args.pid))
    }
}
