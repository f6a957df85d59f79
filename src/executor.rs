// ABOUTME: Command execution boundary: the CommandExecutor trait and a process-backed implementation.
// ABOUTME: ProcessExecutor runs `sh -c` locally, or hands the command to the system ssh client.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ExecutionError;

/// Runs shell commands on the managed host.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command to completion and return its combined output.
    async fn execute(&self, command: &str, timeout: Duration) -> Result<String, ExecutionError>;

    /// Run a command, forwarding output lines as they arrive.
    ///
    /// The default sends the complete output as a single chunk.
    async fn execute_streaming(
        &self,
        command: &str,
        timeout: Duration,
        output: mpsc::UnboundedSender<String>,
    ) -> Result<String, ExecutionError> {
        let result = self.execute(command, timeout).await?;
        let _ = output.send(result.clone());
        Ok(result)
    }
}

/// Executes commands as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    ssh_host: Option<String>,
}

impl ProcessExecutor {
    /// Run commands on this machine.
    pub fn local() -> Self {
        Self { ssh_host: None }
    }

    /// Run commands through `ssh <host>`. Authentication is left to ssh itself.
    pub fn ssh(host: impl Into<String>) -> Self {
        Self {
            ssh_host: Some(host.into()),
        }
    }

    pub fn target(&self) -> &str {
        self.ssh_host.as_deref().unwrap_or("localhost")
    }

    fn build_command(&self, command: &str) -> Command {
        let mut cmd = match &self.ssh_host {
            None => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(command);
                cmd
            }
            Some(host) => {
                let mut cmd = Command::new("ssh");
                cmd.args(["-o", "BatchMode=yes", "-T", host.as_str(), "--", command]);
                cmd
            }
        };
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }
}

fn spawn_error(err: std::io::Error) -> ExecutionError {
    ExecutionError::Spawn(err.to_string())
}

fn finish(code: Option<i32>, output: String) -> Result<String, ExecutionError> {
    match code {
        Some(0) => Ok(output),
        // Killed by a signal.
        None => Err(ExecutionError::NonZeroExit { code: -1, output }),
        Some(code) => Err(ExecutionError::NonZeroExit { code, output }),
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, command: &str, timeout: Duration) -> Result<String, ExecutionError> {
        debug!(target_host = self.target(), %command, "executing");
        let child = self
            .build_command(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ExecutionError::Timeout(timeout))??;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        finish(output.status.code(), text)
    }

    async fn execute_streaming(
        &self,
        command: &str,
        timeout: Duration,
        output: mpsc::UnboundedSender<String>,
    ) -> Result<String, ExecutionError> {
        debug!(target_host = self.target(), %command, "executing (streaming)");
        let mut child = self
            .build_command(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutionError::Spawn("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecutionError::Spawn("stderr not captured".to_string()))?;

        // The child moves into the future so a timeout drops and kills it.
        let run = async move {
            let mut out_lines = BufReader::new(stdout).lines();
            let mut err_lines = BufReader::new(stderr).lines();
            let (mut out_done, mut err_done) = (false, false);
            let mut collected = String::new();

            while !(out_done && err_done) {
                let line = tokio::select! {
                    line = out_lines.next_line(), if !out_done => match line? {
                        Some(line) => line,
                        None => {
                            out_done = true;
                            continue;
                        }
                    },
                    line = err_lines.next_line(), if !err_done => match line? {
                        Some(line) => line,
                        None => {
                            err_done = true;
                            continue;
                        }
                    },
                };
                let _ = output.send(line.clone());
                collected.push_str(&line);
                collected.push('\n');
            }

            let status = child.wait().await?;
            Ok::<_, ExecutionError>((status.code(), collected))
        };

        let (code, collected) = tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| ExecutionError::Timeout(timeout))??;
        finish(code, collected)
    }
}
