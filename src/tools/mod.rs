// ABOUTME: Tool abstraction and registry: descriptors, safety classification, and dispatch lookup.
// ABOUTME: Each tool turns validated arguments into a shell command run through the CommandExecutor.

pub mod args;
pub mod files;
pub mod logs;
pub mod process;
pub mod run_command;
pub mod service;
pub mod system_info;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::approval::SafetyLevel;
use crate::error::{AgentError, ExecutionError, ToolDispatchError};
use crate::executor::CommandExecutor;

pub use args::ToolArguments;

/// Wire-level description of a tool, as sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Everything a tool needs while it runs.
pub struct ToolContext<'a> {
    pub executor: &'a dyn CommandExecutor,
    pub timeout: Duration,
    /// Receives output lines as they are produced, when set.
    pub output: Option<mpsc::UnboundedSender<String>>,
}

impl ToolContext<'_> {
    /// Run a command with the context's timeout, streaming if a sink is attached.
    pub async fn run(&self, command: &str) -> Result<String, ExecutionError> {
        self.run_with_timeout(command, self.timeout).await
    }

    pub async fn run_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<String, ExecutionError> {
        match &self.output {
            Some(tx) => {
                self.executor
                    .execute_streaming(command, timeout, tx.clone())
                    .await
            }
            None => self.executor.execute(command, timeout).await,
        }
    }
}

/// A tool the model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn schema(&self) -> Value;

    /// Decide how this invocation must be gated. Evaluated fresh for every call.
    fn classify(&self, args: &ToolArguments) -> SafetyLevel;

    /// The shell command this invocation runs; also shown when asking for approval.
    fn build_command(&self, args: &ToolArguments) -> Result<String, ToolDispatchError>;

    async fn execute(
        &self,
        command: &str,
        _args: &ToolArguments,
        ctx: &ToolContext<'_>,
    ) -> Result<String, ExecutionError> {
        ctx.run(command).await
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.schema(),
        }
    }
}

/// Immutable set of tools, indexed by exact name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build a registry. Two tools with the same name are rejected.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, AgentError> {
        let mut index = HashMap::with_capacity(tools.len());
        for (i, tool) in tools.iter().enumerate() {
            if index.insert(tool.name().to_string(), i).is_some() {
                return Err(AgentError::Registry(format!(
                    "tool '{}' registered twice",
                    tool.name()
                )));
            }
        }
        Ok(Self { tools, index })
    }

    /// The built-in host management tools.
    pub fn with_builtin_tools() -> Result<Self, AgentError> {
        let run_command = run_command::RunCommandTool::new()
            .map_err(|e| AgentError::Registry(format!("invalid command policy: {}", e)))?;
        Self::new(vec![
            Arc::new(run_command),
            Arc::new(system_info::SystemInfoTool),
            Arc::new(files::ListDirectoryTool),
            Arc::new(files::ReadFileTool),
            Arc::new(logs::SearchLogsTool),
            Arc::new(service::ManageServiceTool),
            Arc::new(process::ManageProcessTool),
        ])
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn Tool>, ToolDispatchError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolDispatchError::NotFound(name.to_string()))
    }

    /// Specs for every tool, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Placeholder for commands that print nothing.
pub const NO_OUTPUT: &str = "(no output)";

/// Prepare tool output for the model: mark empty output and cap the length.
pub fn render_output(output: &str, max_chars: usize) -> String {
    let trimmed = output.trim_end();
    if trimmed.trim().is_empty() {
        return NO_OUTPUT.to_string();
    }
    let total = trimmed.chars().count();
    if total <= max_chars {
        return trimmed.to_string();
    }
    let kept: String = trimmed.chars().take(max_chars).collect();
    format!(
        "{}\n... [output truncated, {} of {} characters shown]",
        kept, max_chars, total
    )
}

/// Quote one argument for a POSIX shell.
pub(crate) fn quote(arg: &str) -> String {
    shell_words::quote(arg).into_owned()
}
