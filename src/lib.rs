// ABOUTME: Library root for hostpilot: re-exports all modules for integration testing.
// ABOUTME: The binary entry point is in main.rs, which uses this crate as a library.

pub mod agent;
pub mod app;
pub mod approval;
pub mod config;
pub mod error;
pub mod executor;
pub mod llm;
pub mod message;
pub mod prompt;
pub mod tokens;
pub mod tools;
