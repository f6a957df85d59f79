// ABOUTME: LLM backend layer: request encoding, event-stream parsing, and the streaming client.
// ABOUTME: Re-exports the backend trait and client used by the agent loop.

pub mod client;
pub mod mock;
pub mod provider;
pub mod sse;
pub mod wire;

pub use client::{ChatBackend, ChatClient, DeltaStream, complete_text, reduce_stream};
pub use provider::{ProviderProfile, ReasoningPolicy, profile_for};
