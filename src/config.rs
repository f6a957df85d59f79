// ABOUTME: Configuration loading for hostpilot.
// ABOUTME: Reads ~/.hostpilot/config.toml, applies env overrides, and exposes settings to the client.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub target: TargetConfig,
    pub logging: LoggingConfig,
}

/// LLM backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_context_tokens: usize,
    pub request_timeout_seconds: u64,
    /// Longest gap between stream chunks before the read is abandoned.
    pub stream_idle_timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            max_context_tokens: 128_000,
            request_timeout_seconds: 30,
            stream_idle_timeout_seconds: 120,
        }
    }
}

/// Agent loop limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub command_timeout_seconds: u64,
    pub max_tool_output_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            command_timeout_seconds: 30,
            max_tool_output_chars: 16_000,
        }
    }
}

/// Where commands run. Without an ssh host, commands run locally.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub ssh_host: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Read access to LLM settings, consulted on every request.
///
/// The protocol client never owns configuration; callers decide where it lives.
pub trait SettingsAccessor: Send + Sync {
    fn llm_settings(&self) -> LlmConfig;
}

impl SettingsAccessor for LlmConfig {
    fn llm_settings(&self) -> LlmConfig {
        self.clone()
    }
}

impl SettingsAccessor for Config {
    fn llm_settings(&self) -> LlmConfig {
        self.llm.clone()
    }
}

impl Config {
    /// Load config from ~/.hostpilot/config.toml, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from an explicit path, falling back to defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Fill gaps and apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.llm.api_key.as_deref().is_none_or(str::is_empty) {
            self.llm.api_key = non_empty("HOSTPILOT_API_KEY").or_else(|| non_empty("OPENAI_API_KEY"));
        }
        if let Some(url) = non_empty("HOSTPILOT_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = non_empty("HOSTPILOT_MODEL") {
            self.llm.model = model;
        }
    }

    /// Base directory for hostpilot files.
    pub fn base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hostpilot")
    }

    /// Path to the config file.
    pub fn config_path() -> PathBuf {
        Self::base_dir().join("config.toml")
    }

    /// Path to the secrets env file.
    pub fn secrets_env_path() -> PathBuf {
        Self::base_dir().join(".env")
    }

    /// Path to the optional system prompt override.
    pub fn prompt_override_path() -> PathBuf {
        Self::base_dir().join("prompt.md")
    }
}
