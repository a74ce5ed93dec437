//! The Dialog State Machine: tracks the
//! one multi-turn sub-flow a user can be in, and the SMART heuristic that
//! decides whether a `goal.create` draft is ready to schedule outright or
//! needs a clarifying follow-up first.

pub mod callback;
pub mod engine;
pub mod error;
pub mod smart;
pub mod state;

pub use callback::{parse_callback, Callback};
pub use engine::{DialogEngine, DialogOutcome, GoalDraftContext};
pub use error::{DialogError, Result};
pub use smart::{validate_smart, GoalDraft, SmartFailure};
pub use state::{DialogState, EventEditField, GoalEditField, StepEditField};
