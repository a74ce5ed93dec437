use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use waypoint_core::types::{GoalStatus, NotificationJobKind, StepStatus, UserId};

use crate::error::Result;
use crate::models::{
    ConversationMessage, Event, EventPatch, Goal, GoalPatch, NewEvent, NewGoal, NewStepDraft,
    NotificationToggle, SessionStateRow, Step, StepFieldPatch, UserProfile,
};

/// Typed CRUD over every domain entity. This is the only
/// interface the orchestration crates (context, dialog, intent, planner,
/// notify, dispatch) depend on — `waypoint-store`'s `sqlite` module is the
/// only place in the workspace that touches `rusqlite::Connection` directly.
///
/// Every multi-row write (goal+step+event creation, cascade deletes,
/// step-status recompute) runs inside one SQLite transaction internally;
/// callers never see a partial write.
pub trait Store: Send + Sync {
    // ---- users -----------------------------------------------------

    fn get_or_create_profile(
        &self,
        user_id: &UserId,
        chat_id: &str,
        default_timezone: &str,
    ) -> Result<UserProfile>;

    fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>>;

    fn update_timezone(&self, user_id: &UserId, timezone: &str) -> Result<()>;

    fn set_notification_toggle(
        &self,
        user_id: &UserId,
        toggle: NotificationToggle,
        enabled: bool,
    ) -> Result<()>;

    /// All known user ids — used only by the notification scheduler to
    /// enumerate the population it scans; never exposed to per-user
    /// handlers.
    fn list_user_ids(&self) -> Result<Vec<UserId>>;

    // ---- goals -------------------------------------------------------

    fn list_goals(&self, user_id: &UserId, status: Option<GoalStatus>) -> Result<Vec<Goal>>;

    fn get_goal(&self, user_id: &UserId, goal_id: i64) -> Result<Option<Goal>>;

    /// Up to `limit` active goals, ordered for the Context Assembler:
    /// most urgent target_date first.
    fn list_active_goals_for_context(&self, user_id: &UserId, limit: i64) -> Result<Vec<Goal>>;

    /// Insert a goal plus its decomposed steps in one transaction.
    /// `is_scheduled` starts `false`; the planner flips it once Phase 3
    /// completes.
    fn create_goal_with_steps(
        &self,
        user_id: &UserId,
        goal: NewGoal,
        steps: Vec<NewStepDraft>,
    ) -> Result<(Goal, Vec<Step>)>;

    /// Delete a goal, its steps, and any events those steps linked to, in
    /// one transaction.
    fn delete_goal_cascade(&self, user_id: &UserId, goal_id: i64) -> Result<bool>;

    /// Recompute `progress_percent` from current step statuses and flip
    /// `status` to `completed` when every step is; returns the updated goal.
    fn recompute_goal_progress(&self, user_id: &UserId, goal_id: i64) -> Result<Goal>;

    /// Applies a `GOAL_EDIT_*` field patch and returns the updated goal.
    fn update_goal(&self, user_id: &UserId, goal_id: i64, patch: GoalPatch) -> Result<Goal>;

    // ---- steps ---------------------------------------------------------

    fn list_steps(&self, user_id: &UserId, goal_id: i64) -> Result<Vec<Step>>;

    fn get_step(&self, user_id: &UserId, step_id: i64) -> Result<Option<Step>>;

    /// `goal.add_step`: `order = max(order)+1` when `order` is
    /// `None`; when `planned_date`
    /// is provided a linked `goal_step` Event is created in the same
    /// transaction.
    #[allow(clippy::too_many_arguments)]
    fn add_step(
        &self,
        user_id: &UserId,
        goal_id: i64,
        title: &str,
        order: Option<i64>,
        planned_date: Option<NaiveDate>,
        planned_time: Option<NaiveTime>,
    ) -> Result<Step>;

    /// Delete a step and its linked event (if any) atomically, then
    /// recompute the parent goal's progress.
    fn delete_step_cascade(&self, user_id: &UserId, step_id: i64) -> Result<bool>;

    /// Transition a step's status, maintaining `completed_at`, then
    /// recompute and return the parent goal.
    fn update_step_status(
        &self,
        user_id: &UserId,
        step_id: i64,
        new_status: StepStatus,
    ) -> Result<Goal>;

    /// Placement write for Scheduler Phase 3: sets the step's
    /// `planned_date/planned_time/duration_minutes` and creates the linked
    /// `goal_step` Event, both in one transaction.
    fn place_step(
        &self,
        user_id: &UserId,
        step_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i64,
    ) -> Result<Step>;

    /// The whole Phase 3 batch in one transaction: every placement's event
    /// insert and step update, plus flipping `goals.is_scheduled`, commit or
    /// roll back together. If any write fails, no step in the batch is left
    /// half-scheduled and the goal is not marked scheduled.
    fn schedule_goal_steps(
        &self,
        user_id: &UserId,
        goal_id: i64,
        placements: &[crate::models::StepPlacement],
    ) -> Result<Vec<Step>>;

    fn list_unscheduled_steps(&self, user_id: &UserId, goal_id: i64) -> Result<Vec<Step>>;

    /// Applies a `STEP_EDIT_*` field patch; if the step carries a
    /// linked `goal_step` event, the event's own date/time stay in sync in
    /// the same transaction (mirrors `update_event`'s reverse-direction sync).
    fn update_step_fields(&self, user_id: &UserId, step_id: i64, patch: StepFieldPatch) -> Result<Step>;

    /// Steps still open whose `planned_date` has passed — feeds the Step
    /// reminder job.
    fn list_overdue_steps(&self, user_id: &UserId, today: NaiveDate) -> Result<Vec<Step>>;

    // ---- events ----------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn list_events(
        &self,
        user_id: &UserId,
        title_like: Option<&str>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        time_from: Option<NaiveTime>,
        time_to: Option<NaiveTime>,
    ) -> Result<Vec<Event>>;

    fn get_event(&self, user_id: &UserId, event_id: i64) -> Result<Option<Event>>;

    fn create_event(&self, user_id: &UserId, event: NewEvent) -> Result<Event>;

    /// Updates an event; if it is `event_type=goal_step`, the linked step's
    /// `planned_date`/`planned_time` are kept in sync in the same
    /// transaction.
    fn update_event(&self, user_id: &UserId, event_id: i64, patch: EventPatch) -> Result<Event>;

    /// Deletes an event; if it was linked to a step, clears the step's
    /// `linked_event_id` in the same transaction.
    fn delete_event(&self, user_id: &UserId, event_id: i64) -> Result<bool>;

    /// Events from `from` to `to` (UTC instants), sorted ascending — feeds
    /// the Context Assembler's `upcoming_events` slot.
    fn list_upcoming_events(
        &self,
        user_id: &UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>>;

    /// Busy `(start, end)` wall-clock intervals on `date`, used by the
    /// Scheduler's availability map (Phase 2).
    fn list_busy_intervals(
        &self,
        user_id: &UserId,
        date: NaiveDate,
    ) -> Result<Vec<(NaiveTime, NaiveTime)>>;

    /// Events whose reminder fires within `[window_start, window_end)` —
    /// feeds the Event reminder job.
    fn list_due_event_reminders(
        &self,
        user_id: &UserId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Event>>;

    // ---- conversation messages ------------------------------------------

    fn append_message(
        &self,
        user_id: &UserId,
        role: &str,
        text: &str,
        intent: Option<&str>,
    ) -> Result<()>;

    fn list_recent_messages(&self, user_id: &UserId, limit: i64) -> Result<Vec<ConversationMessage>>;

    // ---- session state -------------------------------------------------

    fn get_session_state_raw(&self, user_id: &UserId) -> Result<Option<SessionStateRow>>;

    fn set_session_state_raw(
        &self,
        user_id: &UserId,
        state: &str,
        state_context: &str,
    ) -> Result<()>;

    // ---- notification dedup ----------------------------------------------

    /// Attempts to claim the `(user_id, job_kind, key, fire_date)` tuple.
    /// Returns `true` if this call newly claimed it (the notification
    /// should fire) or `false` if it was already claimed (duplicate — do
    /// not fire). Atomic: implemented as `INSERT OR IGNORE` plus a changed-
    /// rows check inside the same statement execution.
    fn try_claim_dedup(
        &self,
        user_id: &UserId,
        job_kind: NotificationJobKind,
        key: &str,
        fire_date: NaiveDate,
    ) -> Result<bool>;
}
