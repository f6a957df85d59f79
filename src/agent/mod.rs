// ABOUTME: Agent module: the turn loop, conversation session, compression, and progress events.
// ABOUTME: AgentLoop is the entry point; Session carries per-conversation state between turns.

pub mod compaction;
pub mod events;
pub mod r#loop;
pub mod session;

pub use compaction::{CompressionOutcome, CompressionState};
pub use events::{AgentEvent, EventSink};
pub use r#loop::{AgentLoop, AgentLoopParams, FALLBACK_MESSAGE, LoopSettings, STOP_INSTRUCTION};
pub use session::Session;
