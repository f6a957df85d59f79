// ABOUTME: Read-only filesystem tools: list_directory and read_file.
// ABOUTME: Paths are shell-quoted; both tools are always safe.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolArguments, quote};
use crate::approval::SafetyLevel;
use crate::error::ToolDispatchError;

#[derive(Debug, Deserialize)]
struct ListDirectoryArgs {
    #[serde(default = "default_path")]
    path: String,
    #[serde(default)]
    show_hidden: bool,
}

fn default_path() -> String {
    ".".to_string()
}

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the contents of a directory with sizes, owners, and permissions."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Directory to list (default: current directory)"},
                "show_hidden": {"type": "boolean", "description": "Include dotfiles"}
            }
        })
    }

    fn classify(&self, _args: &ToolArguments) -> SafetyLevel {
        SafetyLevel::Safe
    }

    fn build_command(&self, args: &ToolArguments) -> Result<String, ToolDispatchError> {
        let args: ListDirectoryArgs = args.decode()?;
        let flags = if args.show_hidden { "-lah" } else { "-lh" };
        Ok(format!("ls {} -- {}", flags, quote(&args.path)))
    }
}

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    path: String,
    /// Only the last N lines.
    #[serde(default)]
    lines: Option<u64>,
}

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a text file on the host. Use `lines` to read only the end of large files."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Absolute path of the file"},
                "lines": {"type": "integer", "description": "Only return the last N lines"}
            },
            "required": ["path"]
        })
    }

    fn classify(&self, _args: &ToolArguments) -> SafetyLevel {
        SafetyLevel::Safe
    }

    fn build_command(&self, args: &ToolArguments) -> Result<String, ToolDispatchError> {
        args.require_str("path")?;
        let args: ReadFileArgs = args.decode()?;
        Ok(match args.lines {
            Some(n) if n > 0 => format!("tail -n {} -- {}", n, quote(&args.path)),
            _ => format!("cat -- {}", quote(&args.path)),
        })
    }
}
