// ABOUTME: Shared fixtures for integration tests: a recording executor and a scripted approval gateway.
// ABOUTME: Lets agent scenarios run without touching the real host or a terminal.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use hostpilot::agent::{AgentLoop, AgentLoopParams, EventSink, LoopSettings};
use hostpilot::approval::{ApprovalDecision, ConfirmationGateway};
use hostpilot::error::ExecutionError;
use hostpilot::executor::CommandExecutor;
use hostpilot::llm::mock::MockBackend;
use hostpilot::message::ToolCall;
use hostpilot::tools::ToolRegistry;

/// Records every command and answers with canned output.
#[derive(Default)]
pub struct MockExecutor {
    commands: Mutex<Vec<String>>,
    output: String,
    fail_with_exit: Option<i32>,
}

impl MockExecutor {
    pub fn with_output(output: &str) -> Self {
        Self {
            output: output.to_string(),
            ..Self::default()
        }
    }

    /// Every command fails with the given exit status.
    pub fn failing(code: i32, output: &str) -> Self {
        Self {
            output: output.to_string(),
            fail_with_exit: Some(code),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute(&self, command: &str, _timeout: Duration) -> Result<String, ExecutionError> {
        self.commands.lock().unwrap().push(command.to_string());
        match self.fail_with_exit {
            Some(code) => Err(ExecutionError::NonZeroExit {
                code,
                output: self.output.clone(),
            }),
            None => Ok(self.output.clone()),
        }
    }
}

/// Answers every approval request with a fixed decision and remembers what was asked.
pub struct ScriptedGateway {
    decision: ApprovalDecision,
    asked: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn approving() -> Self {
        Self::answering(ApprovalDecision::Approved)
    }

    pub fn denying() -> Self {
        Self::answering(ApprovalDecision::Denied)
    }

    fn answering(decision: ApprovalDecision) -> Self {
        Self {
            decision,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfirmationGateway for ScriptedGateway {
    async fn request_approval(&self, _call: &ToolCall, description: &str) -> ApprovalDecision {
        self.asked.lock().unwrap().push(description.to_string());
        self.decision
    }
}

/// An agent over the built-in tools with the given collaborators.
pub fn build_agent(
    backend: &MockBackend,
    executor: Arc<MockExecutor>,
    gateway: Arc<ScriptedGateway>,
    settings: LoopSettings,
    events: EventSink,
) -> AgentLoop {
    AgentLoop::new(AgentLoopParams {
        backend: Arc::new(backend.clone()),
        registry: ToolRegistry::with_builtin_tools().unwrap(),
        executor,
        gateway,
        system_prompt: "You are a careful Linux administrator.".to_string(),
        settings,
        events,
    })
}
