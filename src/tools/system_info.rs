// ABOUTME: GetSystemInfo tool: canned read-only diagnostics grouped by category.
// ABOUTME: Always safe; the command for each category is fixed.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolArguments};
use crate::approval::SafetyLevel;
use crate::error::ToolDispatchError;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Category {
    Overview,
    Cpu,
    Memory,
    Disk,
    Network,
    Processes,
    Os,
}

impl Category {
    fn command(self) -> &'static str {
        match self {
            Category::Overview => "hostname; uptime; free -h; df -h /",
            Category::Cpu => "lscpu; cat /proc/loadavg",
            Category::Memory => "free -h; cat /proc/meminfo | head -20",
            Category::Disk => "df -h; lsblk",
            Category::Network => "ip -brief addr; ip route show; ss -tuln",
            Category::Processes => "ps aux --sort=-%cpu | head -20",
            Category::Os => "cat /etc/os-release; uname -a",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SystemInfoArgs {
    #[serde(default = "default_category")]
    category: Category,
}

fn default_category() -> Category {
    Category::Overview
}

pub struct SystemInfoTool;

#[async_trait]
impl Tool for SystemInfoTool {
    fn name(&self) -> &str {
        "get_system_info"
    }

    fn description(&self) -> &str {
        "Get information about the host: overview, cpu, memory, disk, network, processes, or os."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "enum": ["overview", "cpu", "memory", "disk", "network", "processes", "os"],
                    "description": "Which kind of information to collect"
                }
            },
            "required": ["category"]
        })
    }

    fn classify(&self, _args: &ToolArguments) -> SafetyLevel {
        SafetyLevel::Safe
    }

    fn build_command(&self, args: &ToolArguments) -> Result<String, ToolDispatchError> {
        let args: SystemInfoArgs = args.decode()?;
        Ok(args.category.command().to_string())
    }
}
