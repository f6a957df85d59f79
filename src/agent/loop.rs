// ABOUTME: Agent loop: drives bounded rounds of model call, tool dispatch, and model call again.
// ABOUTME: Enforces per-call safety decisions and reports progress through AgentEvents.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::compaction::{self, CompressionOutcome};
use super::events::{AgentEvent, EventSink};
use super::session::Session;
use crate::approval::{ApprovalDecision, ConfirmationGateway, SafetyLevel};
use crate::config::Config;
use crate::error::AgentError;
use crate::executor::CommandExecutor;
use crate::llm::{ChatBackend, reduce_stream};
use crate::message::{AgentResponse, Message, StreamingDelta, ToolCall};
use crate::tools::{Tool, ToolArguments, ToolContext, ToolRegistry, ToolSpec, render_output};

/// Transient instruction sent once the iteration budget is spent.
pub const STOP_INSTRUCTION: &str = "You have reached the maximum number of tool calls for this request. \
Do not call any more tools. Summarize what you found and what remains to be done.";

/// Returned when the model keeps calling tools after being told to stop.
pub const FALLBACK_MESSAGE: &str = "I stopped after reaching the tool call limit for this request. \
Ask me to continue if you want me to keep going.";

/// Limits for one agent.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Model rounds that may produce tool calls before the forced summary.
    pub max_iterations: usize,
    pub max_context_tokens: usize,
    pub command_timeout: Duration,
    pub max_tool_output_chars: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_iterations: config.agent.max_iterations,
            max_context_tokens: config.llm.max_context_tokens,
            command_timeout: Duration::from_secs(config.agent.command_timeout_seconds),
            max_tool_output_chars: config.agent.max_tool_output_chars,
        }
    }
}

/// Bundled collaborators for the agent loop.
pub struct AgentLoopParams {
    pub backend: Arc<dyn ChatBackend>,
    pub registry: ToolRegistry,
    pub executor: Arc<dyn CommandExecutor>,
    pub gateway: Arc<dyn ConfirmationGateway>,
    pub system_prompt: String,
    pub settings: LoopSettings,
    pub events: EventSink,
}

/// The top-level controller for conversation turns.
pub struct AgentLoop {
    backend: Arc<dyn ChatBackend>,
    registry: ToolRegistry,
    executor: Arc<dyn CommandExecutor>,
    gateway: Arc<dyn ConfirmationGateway>,
    system_prompt: String,
    settings: LoopSettings,
    events: EventSink,
}

impl AgentLoop {
    pub fn new(params: AgentLoopParams) -> Self {
        Self {
            backend: params.backend,
            registry: params.registry,
            executor: params.executor,
            gateway: params.gateway,
            system_prompt: params.system_prompt,
            settings: params.settings,
            events: params.events,
        }
    }

    /// Run one user turn to completion.
    ///
    /// Returns the messages appended after the user message, in order. Only
    /// backend failures end the turn early; everything already appended stays
    /// in the session.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        user_text: &str,
    ) -> Result<Vec<Message>, AgentError> {
        session.push(Message::user(user_text));
        let specs = self.registry.specs();
        let mut appended = Vec::new();
        let mut rounds = 0;

        loop {
            if rounds >= self.settings.max_iterations {
                info!(rounds, "iteration limit reached, forcing a final answer");
                let reply = match self.request(session, &specs, Some(STOP_INSTRUCTION)).await? {
                    AgentResponse::Text { text, reasoning } => {
                        Message::assistant_with_reasoning(text, reasoning)
                    }
                    AgentResponse::ToolCalls { .. } => {
                        warn!("model still calling tools after stop instruction");
                        Message::assistant(FALLBACK_MESSAGE)
                    }
                };
                self.append(session, &mut appended, reply);
                return Ok(appended);
            }

            match self.request(session, &specs, None).await? {
                AgentResponse::Text { text, reasoning } => {
                    debug!(rounds, "turn finished with text");
                    let reply = Message::assistant_with_reasoning(text, reasoning);
                    self.append(session, &mut appended, reply);
                    return Ok(appended);
                }
                AgentResponse::ToolCalls { calls, reasoning } => {
                    rounds += 1;
                    debug!(round = rounds, calls = calls.len(), "dispatching tool calls");
                    let mut queue: VecDeque<ToolCall> = calls.into();
                    let mut reasoning = reasoning;
                    while let Some(call) = queue.pop_front() {
                        let dispatched = self.dispatch(&call).await;
                        let msg = Message::command(call, dispatched.output, reasoning.take());
                        self.append(session, &mut appended, msg);
                        if let Some(notice) = dispatched.notice {
                            self.append(session, &mut appended, Message::system(notice));
                        }
                    }
                }
            }
        }
    }

    fn append(&self, session: &mut Session, appended: &mut Vec<Message>, msg: Message) {
        session.push(msg.clone());
        appended.push(msg.clone());
        self.events.emit(AgentEvent::MessageAppended(msg));
    }

    /// Send the conversation, compressing it first if it no longer fits.
    async fn request(
        &self,
        session: &mut Session,
        specs: &[ToolSpec],
        instruction: Option<&str>,
    ) -> Result<AgentResponse, AgentError> {
        let mut messages = Vec::with_capacity(session.len() + 2);
        messages.push(Message::system(&self.system_prompt));
        messages.extend(session.messages().iter().cloned());

        let outcome = compaction::compress(
            self.backend.as_ref(),
            &messages,
            self.settings.max_context_tokens,
            session.compression_mut(),
        )
        .await?;
        if let CompressionOutcome::Compressed { messages: compressed } = outcome {
            self.events.emit(AgentEvent::ContextCompressed {
                old_count: messages.len(),
                new_count: compressed.len(),
            });
            messages = compressed;
        }

        if let Some(instruction) = instruction {
            messages.push(Message::system(instruction));
        }

        let stream = self.backend.stream_chat(&messages, specs).await?;
        reduce_stream(stream, |delta| match delta {
            StreamingDelta::Reasoning(text) => {
                self.events.emit(AgentEvent::ReasoningDelta(text.clone()))
            }
            StreamingDelta::Content(text) => self.events.emit(AgentEvent::ContentDelta(text.clone())),
            _ => {}
        })
        .await
    }

    /// Resolve, gate, and run one tool call, producing the text the model will see.
    async fn dispatch(&self, call: &ToolCall) -> Dispatched {
        let tool = match self.registry.get(&call.name) {
            Ok(tool) => tool,
            Err(e) => {
                warn!(tool = %call.name, "model called an unknown tool");
                return Dispatched::rejected(call, e);
            }
        };
        let args = match ToolArguments::parse(&call.arguments, &tool.schema()) {
            Ok(args) => args,
            Err(e) => return Dispatched::rejected(call, e),
        };
        let command = match tool.build_command(&args) {
            Ok(command) => command,
            Err(e) => return Dispatched::rejected(call, e),
        };

        let safety = tool.classify(&args);
        self.events.emit(AgentEvent::ToolCallStarted {
            tool_name: call.name.clone(),
            command: command.clone(),
            safety,
        });

        match safety {
            SafetyLevel::Forbidden => {
                warn!(tool = %call.name, %command, "blocked forbidden command");
                return Dispatched {
                    output: format!(
                        "BLOCKED: `{}` matches a forbidden pattern and was not run.",
                        command
                    ),
                    notice: Some(format!("Blocked `{}`: it matches a forbidden pattern.", command)),
                };
            }
            SafetyLevel::NeedsConfirmation => {
                match self.gateway.request_approval(call, &command).await {
                    ApprovalDecision::Approved => info!(tool = %call.name, "approved by user"),
                    ApprovalDecision::Denied => {
                        info!(tool = %call.name, "denied by user");
                        return Dispatched {
                            output: format!("DENIED: the user declined to run `{}`.", command),
                            notice: Some(format!("The user denied `{}`.", command)),
                        };
                    }
                }
            }
            SafetyLevel::Safe => {}
        }

        Dispatched {
            output: self.execute(tool.as_ref(), &command, &args).await,
            notice: None,
        }
    }

    async fn execute(&self, tool: &dyn Tool, command: &str, args: &ToolArguments) -> String {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let output = self.events.is_connected().then_some(tx);

        // The context owns the sender, so the forwarder ends once the tool returns.
        let run = async move {
            let ctx = ToolContext {
                executor: self.executor.as_ref(),
                timeout: self.settings.command_timeout,
                output,
            };
            tool.execute(command, args, &ctx).await
        };
        let forward = async {
            while let Some(line) = rx.recv().await {
                self.events.emit(AgentEvent::ToolOutput(line));
            }
        };
        let (result, ()) = tokio::join!(run, forward);

        match result {
            Ok(output) => render_output(&output, self.settings.max_tool_output_chars),
            Err(e) => {
                debug!(error = %e, "tool execution failed");
                render_output(&format!("ERROR: {}", e), self.settings.max_tool_output_chars)
            }
        }
    }
}

/// What one tool call produced.
struct Dispatched {
    /// The tool result the model sees.
    output: String,
    /// Appended as a system message when the call never ran.
    notice: Option<String>,
}

impl Dispatched {
    fn rejected(call: &ToolCall, error: impl std::fmt::Display) -> Self {
        Self {
            output: format!("ERROR: {}", error),
            notice: Some(format!("Tool call `{}` was rejected: {}", call.name, error)),
        }
    }
}
