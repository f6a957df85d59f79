// ABOUTME: App orchestrator: wires config, LLM client, tools, executor, and agent loop into a REPL.
// ABOUTME: Streams replies to stdout, prompts for approvals, and cancels a turn on Ctrl-C.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::info;

use crate::agent::{AgentEvent, AgentLoop, AgentLoopParams, EventSink, LoopSettings, Session};
use crate::approval::{ApprovalDecision, ChannelGateway, SafetyLevel};
use crate::config::{Config, SettingsAccessor};
use crate::executor::ProcessExecutor;
use crate::llm::ChatClient;
use crate::message::Role;
use crate::prompt::SystemPromptBuilder;
use crate::tools::ToolRegistry;

type StdinLines = Lines<BufReader<Stdin>>;

/// Top-level application that orchestrates all subsystems.
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Set up subsystems, then read and run user turns until `/quit` or end of input.
    pub async fn run(self) -> anyhow::Result<()> {
        let settings: Arc<dyn SettingsAccessor> = Arc::new(self.config.clone());
        let backend = Arc::new(ChatClient::new(settings)?);
        let registry = ToolRegistry::with_builtin_tools()?;
        let executor = match &self.config.target.ssh_host {
            Some(host) => ProcessExecutor::ssh(host.clone()),
            None => ProcessExecutor::local(),
        };

        let system_prompt = SystemPromptBuilder::new()
            .load_override(&Config::prompt_override_path())
            .host(executor.target())
            .tools(registry.names())
            .build();

        let (gateway, mut approvals) = ChannelGateway::new(1);
        let (event_tx, mut events) = mpsc::unbounded_channel();
        let target = executor.target().to_string();

        let agent = AgentLoop::new(AgentLoopParams {
            backend,
            registry,
            executor: Arc::new(executor),
            gateway: Arc::new(gateway),
            system_prompt,
            settings: LoopSettings::from_config(&self.config),
            events: EventSink::new(event_tx),
        });

        println!(
            "hostpilot · {} on {} · /reset to start over, /quit to exit",
            self.config.llm.model, target
        );
        info!(model = %self.config.llm.model, %target, "session started");

        let mut session = Session::new();
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("\n> ");
            std::io::stdout().flush()?;

            let line = tokio::select! {
                line = stdin.next_line() => line.context("failed to read input")?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                break;
            };

            match parse_command(&line) {
                Input::Empty => continue,
                Input::Quit => break,
                Input::Reset => {
                    session.reset();
                    println!("Conversation cleared.");
                    continue;
                }
                Input::Message(text) => {
                    let turn = agent.run_turn(&mut session, text);
                    tokio::pin!(turn);

                    loop {
                        tokio::select! {
                            result = &mut turn => {
                                while let Ok(event) = events.try_recv() {
                                    print_event(&event);
                                }
                                if let Err(e) = result {
                                    eprintln!("\nerror: {}", e);
                                }
                                println!();
                                break;
                            }
                            Some(event) = events.recv() => print_event(&event),
                            Some(pending) = approvals.recv() => {
                                let decision = ask_approval(&mut stdin, &pending.description).await?;
                                pending.respond(decision);
                            }
                            _ = tokio::signal::ctrl_c() => {
                                println!("\n(cancelled)");
                                break;
                            }
                        }
                    }
                    // Anything left over belongs to the cancelled turn.
                    while events.try_recv().is_ok() {}
                }
            }
        }

        Ok(())
    }
}

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Empty,
    Quit,
    Reset,
    Message(&'a str),
}

pub fn parse_command(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Empty,
        "/quit" | "/exit" => Input::Quit,
        "/reset" => Input::Reset,
        text => Input::Message(text),
    }
}

/// Interpret an answer to a `[y/N]` prompt. Anything but yes denies.
pub fn parse_approval(answer: &str) -> ApprovalDecision {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => ApprovalDecision::Approved,
        _ => ApprovalDecision::Denied,
    }
}

async fn ask_approval(stdin: &mut StdinLines, description: &str) -> anyhow::Result<ApprovalDecision> {
    print!("\nRun `{}`? [y/N] ", description);
    std::io::stdout().flush()?;
    let answer = stdin.next_line().await?.unwrap_or_default();
    Ok(parse_approval(&answer))
}

fn print_event(event: &AgentEvent) {
    if let Some(text) = format_event(event) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }
}

/// How an event is shown in the terminal, if at all.
pub fn format_event(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::ContentDelta(text) => Some(text.clone()),
        AgentEvent::ReasoningDelta(_) => None,
        AgentEvent::ToolCallStarted {
            tool_name,
            command,
            safety,
        } => {
            let marker = match safety {
                SafetyLevel::Safe => "",
                SafetyLevel::NeedsConfirmation => " (needs approval)",
                SafetyLevel::Forbidden => " (forbidden)",
            };
            Some(format!("\n[{}] {}{}\n", tool_name, command, marker))
        }
        AgentEvent::ToolOutput(line) => Some(format!("  | {}\n", line.trim_end())),
        AgentEvent::MessageAppended(msg) if msg.role == Role::Command => {
            let output = msg.tool_output.as_deref().unwrap_or_default();
            output
                .starts_with("ERROR:")
                .then(|| format!("  {}\n", output.lines().next().unwrap_or_default()))
        }
        AgentEvent::MessageAppended(msg) if msg.role == Role::System => {
            Some(format!("  ! {}\n", msg.content))
        }
        AgentEvent::MessageAppended(_) => None,
        AgentEvent::ContextCompressed {
            old_count,
            new_count,
        } => Some(format!(
            "\n(context compressed: {} -> {} messages)\n",
            old_count, new_count
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, ToolCall};

    #[test]
    fn commands_are_recognized() {
        assert_eq!(parse_command("  "), Input::Empty);
        assert_eq!(parse_command("/quit"), Input::Quit);
        assert_eq!(parse_command("/exit\n"), Input::Quit);
        assert_eq!(parse_command("/reset"), Input::Reset);
        assert_eq!(parse_command(" df please "), Input::Message("df please"));
    }

    #[test]
    fn only_yes_approves() {
        assert_eq!(parse_approval("y"), ApprovalDecision::Approved);
        assert_eq!(parse_approval("YES\n"), ApprovalDecision::Approved);
        assert_eq!(parse_approval(""), ApprovalDecision::Denied);
        assert_eq!(parse_approval("n"), ApprovalDecision::Denied);
        assert_eq!(parse_approval("sure"), ApprovalDecision::Denied);
    }

    #[test]
    fn tool_start_shows_command_and_gate() {
        let text = format_event(&AgentEvent::ToolCallStarted {
            tool_name: "manage_service".into(),
            command: "systemctl restart nginx".into(),
            safety: SafetyLevel::NeedsConfirmation,
        })
        .unwrap();
        assert!(text.contains("[manage_service] systemctl restart nginx (needs approval)"));
    }

    #[test]
    fn failures_and_notices_are_shown() {
        let call = ToolCall::new("c1", "manage_service", "{}");
        let msg = Message::command(call.clone(), "ERROR: command exited with status 3", None);
        let text = format_event(&AgentEvent::MessageAppended(msg)).unwrap();
        assert!(text.contains("status 3"));

        let notice = Message::system("The user denied `systemctl restart nginx`.");
        let text = format_event(&AgentEvent::MessageAppended(notice)).unwrap();
        assert!(text.contains("! The user denied"));

        let ok = Message::command(call, "active (running)", None);
        assert!(format_event(&AgentEvent::MessageAppended(ok)).is_none());
    }

    #[test]
    fn reasoning_is_hidden() {
        assert!(format_event(&AgentEvent::ReasoningDelta("hmm".into())).is_none());
    }
}
