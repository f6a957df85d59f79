// ABOUTME: ManageService tool: start, stop, restart, reload, enable, or disable a systemd unit.
// ABOUTME: Mutating, so every call needs the user's confirmation.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolArguments, quote};
use crate::approval::SafetyLevel;
use crate::error::ToolDispatchError;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ServiceAction {
    Start,
    Stop,
    Restart,
    Reload,
    Enable,
    Disable,
}

impl ServiceAction {
    fn verb(self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::Reload => "reload",
            ServiceAction::Enable => "enable",
            ServiceAction::Disable => "disable",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManageServiceArgs {
    service: String,
    action: ServiceAction,
}

pub struct ManageServiceTool;

#[async_trait]
impl Tool for ManageServiceTool {
    fn name(&self) -> &str {
        "manage_service"
    }

    fn description(&self) -> &str {
        "Start, stop, restart, reload, enable, or disable a systemd service. Requires user approval."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service": {"type": "string", "description": "Unit name, e.g. nginx"},
                "action": {
                    "type": "string",
                    "enum": ["start", "stop", "restart", "reload", "enable", "disable"]
                },
                "explanation": {"type": "string", "description": "Why this action is needed"}
            },
            "required": ["service", "action"]
        })
    }

    fn classify(&self, _args: &ToolArguments) -> SafetyLevel {
        SafetyLevel::NeedsConfirmation
    }

    fn build_command(&self, args: &ToolArguments) -> Result<String, ToolDispatchError> {
        args.require_str("service")?;
        let args: ManageServiceArgs = args.decode()?;
        Ok(format!("systemctl {} {}", args.action.verb(), quote(&args.service)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_builds_systemctl_command() {
        let tool = ManageServiceTool;
        let args = ToolArguments::parse(r#"{"service":"nginx","action":"restart"}"#, &tool.schema())
            .unwrap();
        assert_eq!(tool.build_command(&args).unwrap(), "systemctl restart nginx");
        assert_eq!(tool.classify(&args), SafetyLevel::NeedsConfirmation);
    }

    #[test]
    fn unsupported_action_is_rejected() {
        let tool = ManageServiceTool;
        assert!(
            ToolArguments::parse(r#"{"service":"nginx","action":"mask"}"#, &tool.schema())
                .is_err()
        );
    }
}
