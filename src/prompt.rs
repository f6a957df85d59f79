// ABOUTME: System prompt builder: compiled-in instructions plus host context and user overrides.
// ABOUTME: The default lives in src/prompts/system.md; ~/.hostpilot/prompt.md replaces it.

use std::fs;
use std::path::Path;

/// Compiled-in default instructions.
const DEFAULT_SYSTEM: &str = include_str!("prompts/system.md");

/// Reads a file if it exists, returning None otherwise.
pub fn read_if_exists(path: &Path) -> Option<String> {
    if path.exists() {
        fs::read_to_string(path).ok()
    } else {
        None
    }
}

/// Assembles the system prompt from the base instructions, a description of
/// the target host, the registered tool names, and optional extra notes.
#[derive(Debug, Clone)]
pub struct SystemPromptBuilder {
    pub base: String,
    pub host: Option<String>,
    pub tool_names: Vec<String>,
    pub notes: Option<String>,
}

impl SystemPromptBuilder {
    /// Creates a new builder loaded with the compiled-in default.
    pub fn new() -> Self {
        Self {
            base: DEFAULT_SYSTEM.to_string(),
            host: None,
            tool_names: Vec::new(),
            notes: None,
        }
    }

    /// Replace the base instructions with the file at `path`, if it exists and is non-empty.
    pub fn load_override(&mut self, path: &Path) -> &mut Self {
        if let Some(content) = read_if_exists(path).filter(|c| !c.trim().is_empty()) {
            self.base = content;
        }
        self
    }

    pub fn host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = Some(host.into());
        self
    }

    pub fn tools<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tool_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn notes(&mut self, notes: impl Into<String>) -> &mut Self {
        self.notes = Some(notes.into());
        self
    }

    /// Concatenates all non-empty sections separated by a blank line.
    pub fn build(&self) -> String {
        let mut environment = Vec::new();
        if let Some(host) = &self.host {
            environment.push(format!("Target host: {}", host));
        }
        if !self.tool_names.is_empty() {
            environment.push(format!("Available tools: {}", self.tool_names.join(", ")));
        }
        let environment =
            (!environment.is_empty()).then(|| format!("## Environment\n\n{}", environment.join("\n")));

        [
            Some(self.base.trim_end().to_string()),
            environment,
            self.notes.clone(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
    }
}

impl Default for SystemPromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
