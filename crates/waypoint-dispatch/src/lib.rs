//! The dispatcher: the orchestration layer that
//! turns one inbound chat message or callback into one `ProcessResponse`,
//! gluing together the Context Assembler, Intent Parser, Dialog State
//! Machine, per-entity handlers and the Goal Decomposer & Auto-Scheduler.
//! This is the one crate every HTTP-facing entry point in the gateway
//! calls into.

pub mod error;
pub mod handlers;
pub mod locks;
pub mod orchestrator;
pub mod response;
pub mod summarizer;

pub use error::{DispatchError, Result};
pub use orchestrator::Orchestrator;
pub use response::ProcessResponse;
