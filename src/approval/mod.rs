// ABOUTME: Tool safety system: classification levels, shell command analysis, and human approval.
// ABOUTME: Policies decide Safe/NeedsConfirmation/Forbidden; the gateway collects user decisions.

pub mod analysis;
pub mod gateway;
pub mod policy;
pub mod types;

pub use analysis::*;
pub use gateway::*;
pub use policy::*;
pub use types::*;
