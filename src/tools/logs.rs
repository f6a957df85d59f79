// ABOUTME: SearchLogs tool: grep the systemd journal or a log file for a pattern.
// ABOUTME: Read-only and always safe; all user-supplied values are shell-quoted.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolArguments, quote};
use crate::approval::SafetyLevel;
use crate::error::ToolDispatchError;

const DEFAULT_LINES: u64 = 100;
const MAX_LINES: u64 = 2000;

#[derive(Debug, Deserialize)]
struct SearchLogsArgs {
    pattern: String,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    since: Option<String>,
    #[serde(default)]
    lines: Option<u64>,
}

pub struct SearchLogsTool;

#[async_trait]
impl Tool for SearchLogsTool {
    fn name(&self) -> &str {
        "search_logs"
    }

    fn description(&self) -> &str {
        "Search logs for a pattern. Searches a log file when `path` is given, otherwise the \
         systemd journal (optionally one `unit`). Returns the most recent matching lines."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string", "description": "Case-insensitive extended regex"},
                "unit": {"type": "string", "description": "systemd unit to restrict the journal search to"},
                "path": {"type": "string", "description": "Log file to search instead of the journal"},
                "since": {"type": "string", "description": "Journal time filter, e.g. '1 hour ago'"},
                "lines": {"type": "integer", "description": "Maximum matching lines to return (default 100)"}
            },
            "required": ["pattern"]
        })
    }

    fn classify(&self, _args: &ToolArguments) -> SafetyLevel {
        SafetyLevel::Safe
    }

    fn build_command(&self, args: &ToolArguments) -> Result<String, ToolDispatchError> {
        args.require_str("pattern")?;
        let args: SearchLogsArgs = args.decode()?;
        let lines = args.lines.unwrap_or(DEFAULT_LINES).clamp(1, MAX_LINES);
        let pattern = quote(&args.pattern);

        if let Some(path) = args.path.filter(|p| !p.trim().is_empty()) {
            return Ok(format!(
                "grep -i -n -E -- {} {} | tail -n {}",
                pattern,
                quote(&path),
                lines
            ));
        }

        let mut cmd = String::from("journalctl --no-pager");
        if let Some(unit) = args.unit.filter(|u| !u.trim().is_empty()) {
            cmd.push_str(&format!(" -u {}", quote(&unit)));
        }
        if let Some(since) = args.since.filter(|s| !s.trim().is_empty()) {
            cmd.push_str(&format!(" --since {}", quote(&since)));
        }
        cmd.push_str(&format!(" -g {} --case-sensitive=false -n {}", pattern, lines));
        Ok(cmd)
    }
}
