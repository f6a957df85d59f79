// ABOUTME: Incremental event-stream decoding: splits chunks into `data:` frames and parses deltas.
// ABOUTME: Tool-call fragments are accumulated per index and released in index order at stream end.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::message::{StreamingDelta, ToolCall};

/// One decoded line of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// The payload of a `data:` line.
    Data(String),
    /// The `data: [DONE]` terminator.
    Done,
}

/// Buffers raw bytes and yields complete lines, keeping partial lines across chunks.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every `data:` line it completes. Other lines are ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseLine> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(line) = decode_line(&raw) {
                lines.push(line);
            }
        }
        lines
    }

    /// Flush a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Option<SseLine> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        decode_line(&raw)
    }
}

fn decode_line(raw: &[u8]) -> Option<SseLine> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches(['\n', '\r']);
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload == "[DONE]" {
        return Some(SseLine::Done);
    }
    if payload.is_empty() {
        return None;
    }
    Some(SseLine::Data(payload.to_string()))
}

/// Metadata tracked for a tool call being assembled from streaming fragments.
#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    json_buf: String,
}

/// Turns `data:` payloads into deltas, holding tool-call fragments until the stream ends.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    pending_tools: BTreeMap<u64, PendingToolCall>,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one frame. Malformed frames yield nothing.
    pub fn push_frame(&mut self, payload: &str) -> Vec<StreamingDelta> {
        let frame: Value = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "skipping malformed stream frame");
                return Vec::new();
            }
        };
        let Some(delta) = frame
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
        else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let reasoning = delta
            .get("reasoning_content")
            .or_else(|| delta.get("reasoning"))
            .and_then(Value::as_str);
        if let Some(text) = reasoning.filter(|t| !t.is_empty()) {
            out.push(StreamingDelta::Reasoning(text.to_string()));
        }
        if let Some(text) = delta
            .get("content")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
        {
            out.push(StreamingDelta::Content(text.to_string()));
        }
        if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
            for fragment in calls {
                self.push_tool_fragment(fragment);
            }
        }
        out
    }

    fn push_tool_fragment(&mut self, fragment: &Value) {
        let index = fragment.get("index").and_then(Value::as_u64).unwrap_or(0);
        let pending = self.pending_tools.entry(index).or_default();
        if let Some(id) = fragment.get("id").and_then(Value::as_str) {
            if pending.id.is_empty() {
                pending.id = id.to_string();
            }
        }
        let function = fragment.get("function");
        if let Some(name) = function
            .and_then(|f| f.get("name"))
            .and_then(Value::as_str)
        {
            if pending.name.is_empty() {
                pending.name = name.to_string();
            }
        }
        if let Some(args) = function
            .and_then(|f| f.get("arguments"))
            .and_then(Value::as_str)
        {
            pending.json_buf.push_str(args);
        }
    }

    /// Release every accumulated tool call in index order.
    ///
    /// Entries that never received a function name are dropped; a missing id
    /// is synthesized from the index.
    pub fn finish(&mut self) -> Vec<StreamingDelta> {
        std::mem::take(&mut self.pending_tools)
            .into_iter()
            .filter(|(_, p)| !p.name.is_empty())
            .map(|(index, p)| {
                let id = if p.id.is_empty() {
                    format!("call_{}", index)
                } else {
                    p.id
                };
                StreamingDelta::ToolCall(ToolCall::new(id, p.name, p.json_buf))
            })
            .collect()
    }
}
