//! The Context Assembler: assembles the
//! read-only prompt bundle handed to the model on every turn, and owns the
//! typed template registry that renders it into the literal prompt string.

pub mod assembler;
pub mod bundle;
pub mod error;
pub mod templates;

pub use assembler::ContextAssembler;
pub use bundle::{EventSummarySlot, GoalSummarySlot, HistoryTurnSlot, PromptBundle};
pub use error::{ContextError, Result};
