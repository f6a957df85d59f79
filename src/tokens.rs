// ABOUTME: Heuristic token estimation for mixed-script text and whole conversations.
// ABOUTME: CJK code points count double; runs of other characters count one token per four.

use crate::message::Message;

/// Fixed per-message cost for role markers and framing.
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Whether a character falls in a CJK block that tokenizes at roughly two tokens per code point.
fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x3000..=0x303F     // CJK symbols and punctuation
        | 0x3040..=0x30FF   // Hiragana, Katakana
        | 0x3400..=0x4DBF   // CJK extension A
        | 0x4E00..=0x9FFF   // CJK unified ideographs
        | 0xAC00..=0xD7AF   // Hangul syllables
        | 0xF900..=0xFAFF   // CJK compatibility ideographs
        | 0xFF00..=0xFFEF   // Halfwidth and fullwidth forms
        | 0x20000..=0x2A6DF // CJK extension B
    )
}

/// Estimate the token count of a piece of text. Always at least 1.
pub fn estimate(text: &str) -> usize {
    let mut tokens = 0;
    let mut run = 0;
    for c in text.chars() {
        if is_cjk(c) {
            tokens += run / 4;
            run = 0;
            tokens += 2;
        } else {
            run += 1;
        }
    }
    tokens += run / 4;
    tokens.max(1)
}

/// Estimate one message, including structural overhead.
///
/// For command messages the tool output is counted with the content, since
/// it is what the model actually receives as the tool result.
pub fn estimate_message(msg: &Message) -> usize {
    let mut total = MESSAGE_OVERHEAD_TOKENS + estimate(&msg.content);
    if let Some(output) = &msg.tool_output {
        total += estimate(output);
    }
    if let Some(call) = &msg.tool_call {
        if let Ok(json) = serde_json::to_string(call) {
            total += estimate(&json);
        }
    }
    if let Some(reasoning) = &msg.reasoning {
        total += estimate(reasoning);
    }
    total
}

/// Sum estimates across a conversation, skipping placeholder entries.
pub fn estimate_for_messages(messages: &[Message]) -> usize {
    messages
        .iter()
        .filter(|m| !m.pending)
        .map(estimate_message)
        .sum()
}
