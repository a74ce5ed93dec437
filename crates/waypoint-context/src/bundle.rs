//! The prompt bundle the Context Assembler produces each turn.
//! Opaque to its consumers in the sense that nothing
//! outside `waypoint-context` constructs one directly — but every field is
//! a plain typed struct, not a JSON blob, so a missing field is a compile
//! error rather than a runtime templating failure.

use chrono::NaiveDate;

/// `(title, progress, target_date)` for one active goal — bounded to the
/// top 20.
#[derive(Debug, Clone)]
pub struct GoalSummarySlot {
    pub title: String,
    pub progress_percent: u8,
    pub target_date: Option<NaiveDate>,
}

/// One upcoming event rendered for the prompt: title plus a local-time
/// label already formatted in the user's timezone.
#[derive(Debug, Clone)]
pub struct EventSummarySlot {
    pub title: String,
    pub when_local: String,
}

/// One turn of conversation history.
#[derive(Debug, Clone)]
pub struct HistoryTurnSlot {
    pub role: String,
    pub text: String,
}

/// The maximum number of active goals carried into the bundle.
pub const MAX_ACTIVE_GOALS: i64 = 20;
/// The lookahead window for upcoming events: now to now + 7 days.
pub const UPCOMING_EVENTS_DAYS: i64 = 7;
/// The conversation history depth carried into the bundle: last 5 turns.
pub const HISTORY_TURNS: i64 = 5;

#[derive(Debug, Clone)]
pub struct PromptBundle {
    pub user_name: String,
    pub timezone: String,
    /// `now` formatted to the user's zone, minute precision.
    pub now: String,
    pub active_goals: Vec<GoalSummarySlot>,
    pub upcoming_events: Vec<EventSummarySlot>,
    pub conversation_history: Vec<HistoryTurnSlot>,
    /// Serialized current dialog state, present only when non-idle.
    pub state_context: Option<String>,
}
