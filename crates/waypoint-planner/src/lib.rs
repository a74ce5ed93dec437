//! The Goal Decomposer & Auto-Scheduler:
//! turns a validated goal draft into a persisted `Goal` with steps placed
//! onto the calendar.

pub mod availability;
pub mod decompose;
pub mod error;
pub mod placement;
pub mod planner;

pub use decompose::{DecomposedStep, Decomposer};
pub use error::{PlannerError, Result};
pub use planner::{GoalDraftInput, GoalPlanner, ScheduledGoal};
