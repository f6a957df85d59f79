// ABOUTME: Context compression: summarizes older history when a request nears the token limit.
// ABOUTME: The system prompt stays pinned; recent messages are kept verbatim within a budget.

use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::llm::{ChatBackend, complete_text};
use crate::message::{Message, Role};
use crate::tokens::{estimate_for_messages, estimate_message};

/// Compression starts once the estimate exceeds this share of the context window.
pub const TRIGGER_RATIO: f64 = 0.95;

/// Share of the context window kept for the system prompt and recent messages.
pub const RETAIN_RATIO: f64 = 0.70;

pub const SUMMARY_PREFIX: &str = "Summary of earlier conversation:";

pub const SUMMARIZATION_PROMPT: &str = "You are compressing the history of a server administration session. \
Summarize the conversation below in at most 200 words. Keep the host facts that were discovered, \
the commands that were run and their important results, what the user asked for, and anything still \
unresolved. Write plain prose with no preamble.";

/// Tool output beyond this many characters is cut from the summarization transcript.
const TRANSCRIPT_OUTPUT_CHARS: usize = 2_000;

/// Cached summary for one conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressionState {
    /// The most recent non-empty summary.
    pub summary: Option<String>,
    /// How many history messages (after the system prompt) the summary covers.
    pub covered: usize,
}

impl CompressionState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Result of a compression attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CompressionOutcome {
    /// The request fits; send it as-is.
    Unchanged,
    /// Older history was replaced by a summary.
    Compressed { messages: Vec<Message> },
}

/// Whether a request of this size must be compressed.
pub fn needs_compression(messages: &[Message], max_tokens: usize) -> bool {
    if messages.len() <= 2 {
        return false;
    }
    estimate_for_messages(messages) as f64 > TRIGGER_RATIO * max_tokens as f64
}

/// Number of leading (post-system) messages that fall outside the retain budget.
///
/// Walks backward from the newest message; the newest is always kept.
pub fn split_point(history: &[Message], budget: usize) -> usize {
    let mut used = 0;
    let mut keep = 0;
    for msg in history.iter().rev() {
        let cost = if msg.pending { 0 } else { estimate_message(msg) };
        if keep > 0 && used + cost > budget {
            break;
        }
        used += cost;
        keep += 1;
    }
    history.len() - keep
}

/// Shrink `messages` to fit `max_tokens`, reusing or refreshing the cached summary.
///
/// `messages[0]` is pinned when it is a system message. Summarization failures
/// degrade to dropping the old slice without a summary; only configuration
/// errors propagate.
pub async fn compress(
    backend: &dyn ChatBackend,
    messages: &[Message],
    max_tokens: usize,
    state: &mut CompressionState,
) -> Result<CompressionOutcome, AgentError> {
    if !needs_compression(messages, max_tokens) {
        return Ok(CompressionOutcome::Unchanged);
    }

    let (system, history) = match messages.split_first() {
        Some((first, rest)) if first.role == Role::System => (Some(first), rest),
        _ => (None, messages),
    };
    let system_cost = system.map(estimate_message).unwrap_or(0);
    let budget = ((RETAIN_RATIO * max_tokens as f64) as usize).saturating_sub(system_cost);
    let split = split_point(history, budget);
    if split == 0 {
        debug!("nothing old enough to summarize");
        return Ok(CompressionOutcome::Unchanged);
    }
    let (old, recent) = history.split_at(split);

    let summary = match (state.summary.clone(), state.covered) {
        (Some(cached), covered) if covered == split => {
            debug!(covered, "reusing cached summary");
            cached
        }
        (Some(cached), covered) if covered < split => {
            debug!(covered, split, "extending cached summary");
            let extended =
                summarize_or_degrade(backend, Some(&cached), &old[covered..], state, split).await?;
            if extended.is_empty() {
                // Still accurate for the messages it covers.
                cached
            } else {
                extended
            }
        }
        _ => {
            debug!(split, "summarizing old history");
            summarize_or_degrade(backend, None, old, state, split).await?
        }
    };

    let mut compressed = Vec::with_capacity(recent.len() + 2);
    compressed.extend(system.cloned());
    if !summary.is_empty() {
        compressed.push(Message::system(format!("{}\n{}", SUMMARY_PREFIX, summary)));
    }
    compressed.extend(recent.iter().cloned());

    info!(
        old_count = messages.len(),
        new_count = compressed.len(),
        "compressed conversation context"
    );
    Ok(CompressionOutcome::Compressed {
        messages: compressed,
    })
}

async fn summarize_or_degrade(
    backend: &dyn ChatBackend,
    previous: Option<&String>,
    slice: &[Message],
    state: &mut CompressionState,
    split: usize,
) -> Result<String, AgentError> {
    match summarize(backend, previous.map(String::as_str), slice).await {
        Ok(summary) if !summary.is_empty() => {
            state.summary = Some(summary.clone());
            state.covered = split;
            Ok(summary)
        }
        Ok(_) => {
            warn!("summarization returned nothing");
            Ok(String::new())
        }
        Err(e) if e.is_configuration() => Err(e),
        Err(e) => {
            warn!(error = %e, "summarization failed, continuing without summary");
            Ok(String::new())
        }
    }
}

/// Ask the backend for a summary of `slice`, folding in an earlier summary if given.
pub async fn summarize(
    backend: &dyn ChatBackend,
    previous: Option<&str>,
    slice: &[Message],
) -> Result<String, AgentError> {
    let mut prompt = String::new();
    if let Some(previous) = previous {
        prompt.push_str("Existing summary:\n");
        prompt.push_str(previous);
        prompt.push_str("\n\nNew messages to fold in:\n");
    }
    prompt.push_str(&render_transcript(slice));

    let request = [Message::system(SUMMARIZATION_PROMPT), Message::user(prompt)];
    let text = complete_text(backend, &request).await?;
    Ok(text.trim().to_string())
}

/// Flatten messages into a plain-text transcript for summarization.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for msg in messages.iter().filter(|m| !m.pending) {
        match msg.role {
            Role::User => out.push_str(&format!("User: {}\n", msg.content)),
            Role::Assistant => out.push_str(&format!("Assistant: {}\n", msg.content)),
            Role::System => out.push_str(&format!("System: {}\n", msg.content)),
            Role::Command => {
                let call = msg
                    .tool_call
                    .as_ref()
                    .map(|c| format!("{} {}", c.name, c.arguments))
                    .unwrap_or_default();
                let output = msg.tool_output.as_deref().unwrap_or_default();
                let clipped: String = output.chars().take(TRANSCRIPT_OUTPUT_CHARS).collect();
                out.push_str(&format!("Tool call: {}\nResult: {}\n", call, clipped));
            }
        }
    }
    out
}
