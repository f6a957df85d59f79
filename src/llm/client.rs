// ABOUTME: Streaming chat-completions client with connection-loss retry and one-shot self-healing.
// ABOUTME: Responses are exposed as a stream of StreamingDelta values ending in Done or Error.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::provider::{corrected_policy, profile_for};
use super::sse::{DeltaAccumulator, LineDecoder, SseLine};
use super::wire::build_request_body;
use crate::config::{LlmConfig, SettingsAccessor};
use crate::error::AgentError;
use crate::message::{AgentResponse, Message, StreamingDelta};
use crate::tools::ToolSpec;

/// Deltas for one response, always terminated by exactly one Done or Error.
pub type DeltaStream = Pin<Box<dyn Stream<Item = StreamingDelta> + Send>>;

/// Total attempts for one request when the connection drops before a response arrives.
const MAX_SEND_ATTEMPTS: u32 = 2;
/// Fixed pause before re-sending after a lost connection.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A backend that can stream a chat completion.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the conversation and return the parsed delta stream.
    ///
    /// Errors here are turn-fatal; failures after the stream opened arrive
    /// as a trailing `StreamingDelta::Error`.
    async fn stream_chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<DeltaStream, AgentError>;
}

/// HTTP client for OpenAI-compatible `/chat/completions` endpoints.
pub struct ChatClient {
    http: Client,
    settings: Arc<dyn SettingsAccessor>,
}

impl ChatClient {
    pub fn new(settings: Arc<dyn SettingsAccessor>) -> Result<Self, AgentError> {
        // No overall timeout: it would cap the length of a streamed body.
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AgentError::Configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, settings })
    }

    /// POST the request, healing the reasoning shape once if a 400 asks for it.
    async fn open(
        &self,
        settings: &LlmConfig,
        api_key: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Response, AgentError> {
        let url = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));
        let profile = profile_for(&settings.base_url, &settings.model);
        let mut policy = profile.reasoning;
        let mut healed = false;
        debug!(provider = profile.name, ?policy, %url, "opening chat stream");

        loop {
            let body = build_request_body(&settings.model, messages, tools, policy);
            let response = self.send(&url, api_key, &body, settings).await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let text = response.text().await.unwrap_or_default();
            if status == StatusCode::BAD_REQUEST && !healed {
                if let Some(corrected) = corrected_policy(&text).filter(|p| *p != policy) {
                    info!(from = ?policy, to = ?corrected, "retrying with corrected reasoning fields");
                    policy = corrected;
                    healed = true;
                    continue;
                }
            }
            warn!(status = status.as_u16(), "backend rejected request");
            return Err(AgentError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
    }

    /// Send one request body, retrying once after a lost connection.
    async fn send(
        &self,
        url: &str,
        api_key: &str,
        body: &Value,
        settings: &LlmConfig,
    ) -> Result<Response, AgentError> {
        let wait = Duration::from_secs(settings.request_timeout_seconds);
        let mut attempt = 1;
        loop {
            let request = self.http.post(url).bearer_auth(api_key).json(body).send();
            match tokio::time::timeout(wait, request).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) if attempt < MAX_SEND_ATTEMPTS && is_connection_lost(&e) => {
                    warn!(attempt, error = %e, "connection lost, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                    attempt += 1;
                }
                Ok(Err(e)) => return Err(AgentError::Transport(e.to_string())),
                Err(_) => {
                    return Err(AgentError::Transport(format!(
                        "no response within {}s",
                        wait.as_secs()
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn stream_chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<DeltaStream, AgentError> {
        let settings = self.settings.llm_settings();
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::Configuration("no API key configured".to_string()))?;

        let response = self.open(&settings, &api_key, messages, tools).await?;
        let idle = Duration::from_secs(settings.stream_idle_timeout_seconds);
        Ok(delta_stream(response, idle))
    }
}

fn is_connection_lost(err: &reqwest::Error) -> bool {
    !err.is_timeout() && (err.is_connect() || err.is_request())
}

/// Read the response body as an event stream.
///
/// Dropping the returned stream drops the body and aborts the read.
fn delta_stream(mut response: Response, idle: Duration) -> DeltaStream {
    Box::pin(stream! {
        let mut lines = LineDecoder::new();
        let mut acc = DeltaAccumulator::new();
        let mut failure: Option<String> = None;

        'read: loop {
            let pending = match tokio::time::timeout(idle, response.chunk()).await {
                Ok(Ok(Some(chunk))) => lines.feed(&chunk),
                Ok(Ok(None)) => {
                    if let Some(SseLine::Data(payload)) = lines.finish() {
                        for delta in acc.push_frame(&payload) {
                            yield delta;
                        }
                    }
                    break 'read;
                }
                Ok(Err(e)) => {
                    failure = Some(format!("stream read failed: {}", e));
                    break 'read;
                }
                Err(_) => {
                    failure = Some(format!("stream stalled for {}s", idle.as_secs()));
                    break 'read;
                }
            };
            for line in pending {
                match line {
                    SseLine::Done => break 'read,
                    SseLine::Data(payload) => {
                        for delta in acc.push_frame(&payload) {
                            yield delta;
                        }
                    }
                }
            }
        }

        for call in acc.finish() {
            yield call;
        }
        match failure {
            Some(message) => {
                warn!(%message, "stream ended with error");
                yield StreamingDelta::Error(message);
            }
            None => yield StreamingDelta::Done,
        }
    })
}

/// Fold a delta stream into a single response, showing each delta to `observe` first.
///
/// A trailing `Error` delta becomes a transport error.
pub async fn reduce_stream(
    mut stream: DeltaStream,
    mut observe: impl FnMut(&StreamingDelta),
) -> Result<AgentResponse, AgentError> {
    let mut text = String::new();
    let mut reasoning = String::new();
    let mut calls = Vec::new();

    while let Some(delta) = stream.next().await {
        observe(&delta);
        match delta {
            StreamingDelta::Reasoning(chunk) => reasoning.push_str(&chunk),
            StreamingDelta::Content(chunk) => text.push_str(&chunk),
            StreamingDelta::ToolCall(call) => calls.push(call),
            StreamingDelta::Done => break,
            StreamingDelta::Error(message) => return Err(AgentError::Transport(message)),
        }
    }

    let reasoning = (!reasoning.is_empty()).then_some(reasoning);
    if calls.is_empty() {
        Ok(AgentResponse::Text { text, reasoning })
    } else {
        Ok(AgentResponse::ToolCalls { calls, reasoning })
    }
}

/// Run a tool-less request and return its text.
pub async fn complete_text(
    backend: &dyn ChatBackend,
    messages: &[Message],
) -> Result<String, AgentError> {
    let stream = backend.stream_chat(messages, &[]).await?;
    match reduce_stream(stream, |_| {}).await? {
        AgentResponse::Text { text, .. } => Ok(text),
        AgentResponse::ToolCalls { .. } => Ok(String::new()),
    }
}
