use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use waypoint_core::types::{EventType, GoalStatus, Priority, StepStatus, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub chat_id: String,
    pub timezone: String,
    pub notify_enabled: bool,
    pub notify_event_reminders: bool,
    pub notify_goal_deadlines: bool,
    pub notify_step_reminders: bool,
    pub notify_motivation: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which of a profile's five independent notification toggles to flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationToggle {
    EventReminders,
    GoalDeadlines,
    StepReminders,
    Motivation,
    Enabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub goal_id: i64,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub status: GoalStatus,
    pub progress_percent: u8,
    pub target_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub priority: Priority,
    pub is_scheduled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a new goal. `status`/`progress_percent`/
/// `is_scheduled` are not here — they're always `active`/`0`/`false` at
/// creation; `progress_percent` is always derived from completed steps.
#[derive(Debug, Clone)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub step_id: i64,
    pub goal_id: i64,
    pub user_id: UserId,
    pub title: String,
    pub order: i64,
    pub status: StepStatus,
    pub estimated_hours: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub planned_date: Option<NaiveDate>,
    pub planned_time: Option<NaiveTime>,
    pub duration_minutes: Option<i64>,
    pub linked_event_id: Option<i64>,
}

/// A single step as produced by the decomposer, before an `order` has been
/// assigned a concrete row.
#[derive(Debug, Clone)]
pub struct NewStepDraft {
    pub title: String,
    pub order: i64,
    pub estimated_hours: f64,
}

/// One Phase 3 placement write, batched with its siblings into a single
/// transaction by `Store::schedule_goal_steps`.
#[derive(Debug, Clone)]
pub struct StepPlacement {
    pub step_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i64,
}

/// A sparse patch for the `GOAL_EDIT_*` dialog states — one field
/// set per edit turn, `None` means "leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub target_date: Option<Option<NaiveDate>>,
    pub category: Option<Option<String>>,
    pub priority: Option<Priority>,
}

/// A sparse patch for the `STEP_EDIT_*` dialog states. Unlike
/// `update_step_status`, this never touches `status`/`completed_at`.
#[derive(Debug, Clone, Default)]
pub struct StepFieldPatch {
    pub title: Option<String>,
    pub planned_date: Option<Option<NaiveDate>>,
    pub planned_time: Option<Option<NaiveTime>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: i64,
    pub user_id: UserId,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub duration_minutes: i64,
    pub repeat: Option<String>,
    pub notes: Option<String>,
    pub event_type: EventType,
    pub linked_step_id: Option<i64>,
    pub linked_goal_id: Option<i64>,
    pub reminder_minutes_before: i64,
    pub reminder_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub duration_minutes: i64,
    pub repeat: Option<String>,
    pub notes: Option<String>,
    pub reminder_minutes_before: i64,
    pub reminder_enabled: bool,
}

impl Default for NewEvent {
    fn default() -> Self {
        Self {
            title: String::new(),
            date: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
            time: None,
            duration_minutes: 60,
            repeat: None,
            notes: None,
            reminder_minutes_before: 15,
            reminder_enabled: true,
        }
    }
}

/// A sparse patch for `event.mutate { op: update }` and the `EVENT_EDIT_*`
/// dialog states — `None` means "leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<Option<NaiveTime>>,
    pub duration_minutes: Option<i64>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub msg_id: i64,
    pub user_id: UserId,
    pub role: String,
    pub text: String,
    pub intent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The session-state row as the store sees it: an opaque label plus an
/// opaque JSON context bag. Only `waypoint-dialog` knows how to interpret
/// `state`/`state_context` — the store never depends on the dialog crate's
/// `DialogState` enum, so this stays string-typed at the storage boundary.
#[derive(Debug, Clone)]
pub struct SessionStateRow {
    pub user_id: UserId,
    pub state: String,
    pub state_context: String,
    pub updated_at: DateTime<Utc>,
}

/// Retention window for conversation history: last K messages per user.
pub const CONVERSATION_HISTORY_LIMIT: i64 = 50;
