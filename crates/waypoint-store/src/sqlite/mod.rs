//! `SqliteStore` — the one reference [`crate::traits::Store`] implementation
//! shipped in this workspace. The whole connection lives behind a
//! `Mutex<Connection>`.

pub mod conversations;
pub mod dedup;
pub mod events;
pub mod goals;
pub mod session;
pub mod steps;
pub mod users;

use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use waypoint_core::types::{GoalStatus, NotificationJobKind, StepStatus, UserId};

use crate::error::Result;
use crate::models::{
    ConversationMessage, Event, EventPatch, Goal, GoalPatch, NewEvent, NewGoal, NewStepDraft,
    NotificationToggle, SessionStateRow, Step, StepFieldPatch, UserProfile,
};
use crate::schema::init_db;
use crate::traits::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if absent) the SQLite file at `path` and initialise
    /// the schema. `:memory:` is accepted for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }
}

impl Store for SqliteStore {
    fn get_or_create_profile(
        &self,
        user_id: &UserId,
        chat_id: &str,
        default_timezone: &str,
    ) -> Result<UserProfile> {
        let conn = self.conn.lock().unwrap();
        users::get_or_create_profile(&conn, user_id, chat_id, default_timezone)
    }

    fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let conn = self.conn.lock().unwrap();
        users::get_profile(&conn, user_id)
    }

    fn update_timezone(&self, user_id: &UserId, timezone: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        users::update_timezone(&conn, user_id, timezone)
    }

    fn set_notification_toggle(
        &self,
        user_id: &UserId,
        toggle: NotificationToggle,
        enabled: bool,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        users::set_notification_toggle(&conn, user_id, toggle, enabled)
    }

    fn list_user_ids(&self) -> Result<Vec<UserId>> {
        let conn = self.conn.lock().unwrap();
        users::list_user_ids(&conn)
    }

    fn list_goals(&self, user_id: &UserId, status: Option<GoalStatus>) -> Result<Vec<Goal>> {
        let conn = self.conn.lock().unwrap();
        goals::list_goals(&conn, user_id, status)
    }

    fn get_goal(&self, user_id: &UserId, goal_id: i64) -> Result<Option<Goal>> {
        let conn = self.conn.lock().unwrap();
        goals::get_goal(&conn, user_id, goal_id)
    }

    fn list_active_goals_for_context(&self, user_id: &UserId, limit: i64) -> Result<Vec<Goal>> {
        let conn = self.conn.lock().unwrap();
        goals::list_active_goals_for_context(&conn, user_id, limit)
    }

    fn create_goal_with_steps(
        &self,
        user_id: &UserId,
        goal: NewGoal,
        steps: Vec<NewStepDraft>,
    ) -> Result<(Goal, Vec<Step>)> {
        let mut conn = self.conn.lock().unwrap();
        goals::create_goal_with_steps(&mut conn, user_id, goal, steps)
    }

    fn delete_goal_cascade(&self, user_id: &UserId, goal_id: i64) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        goals::delete_goal_cascade(&mut conn, user_id, goal_id)
    }

    fn recompute_goal_progress(&self, user_id: &UserId, goal_id: i64) -> Result<Goal> {
        let mut conn = self.conn.lock().unwrap();
        goals::recompute_goal_progress(&mut conn, user_id, goal_id)
    }

    fn update_goal(&self, user_id: &UserId, goal_id: i64, patch: GoalPatch) -> Result<Goal> {
        let conn = self.conn.lock().unwrap();
        goals::update_goal(&conn, user_id, goal_id, patch)
    }

    fn list_steps(&self, user_id: &UserId, goal_id: i64) -> Result<Vec<Step>> {
        let conn = self.conn.lock().unwrap();
        steps::list_steps(&conn, user_id, goal_id)
    }

    fn get_step(&self, user_id: &UserId, step_id: i64) -> Result<Option<Step>> {
        let conn = self.conn.lock().unwrap();
        steps::get_step(&conn, user_id, step_id)
    }

    fn add_step(
        &self,
        user_id: &UserId,
        goal_id: i64,
        title: &str,
        order: Option<i64>,
        planned_date: Option<NaiveDate>,
        planned_time: Option<NaiveTime>,
    ) -> Result<Step> {
        let mut conn = self.conn.lock().unwrap();
        steps::add_step(&mut conn, user_id, goal_id, title, order, planned_date, planned_time)
    }

    fn delete_step_cascade(&self, user_id: &UserId, step_id: i64) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        steps::delete_step_cascade(&mut conn, user_id, step_id)
    }

    fn update_step_status(
        &self,
        user_id: &UserId,
        step_id: i64,
        new_status: StepStatus,
    ) -> Result<Goal> {
        let mut conn = self.conn.lock().unwrap();
        steps::update_step_status(&mut conn, user_id, step_id, new_status)
    }

    fn place_step(
        &self,
        user_id: &UserId,
        step_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i64,
    ) -> Result<Step> {
        let mut conn = self.conn.lock().unwrap();
        steps::place_step(&mut conn, user_id, step_id, date, time, duration_minutes)
    }

    fn schedule_goal_steps(
        &self,
        user_id: &UserId,
        goal_id: i64,
        placements: &[crate::models::StepPlacement],
    ) -> Result<Vec<Step>> {
        let mut conn = self.conn.lock().unwrap();
        steps::schedule_goal_steps(&mut conn, user_id, goal_id, placements)
    }

    fn list_unscheduled_steps(&self, user_id: &UserId, goal_id: i64) -> Result<Vec<Step>> {
        let conn = self.conn.lock().unwrap();
        steps::list_unscheduled_steps(&conn, user_id, goal_id)
    }

    fn update_step_fields(&self, user_id: &UserId, step_id: i64, patch: StepFieldPatch) -> Result<Step> {
        let mut conn = self.conn.lock().unwrap();
        steps::update_step_fields(&mut conn, user_id, step_id, patch)
    }

    fn list_overdue_steps(&self, user_id: &UserId, today: NaiveDate) -> Result<Vec<Step>> {
        let conn = self.conn.lock().unwrap();
        steps::list_overdue_steps(&conn, user_id, today)
    }

    fn list_events(
        &self,
        user_id: &UserId,
        title_like: Option<&str>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        time_from: Option<NaiveTime>,
        time_to: Option<NaiveTime>,
    ) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        events::list_events(&conn, user_id, title_like, date_from, date_to, time_from, time_to)
    }

    fn get_event(&self, user_id: &UserId, event_id: i64) -> Result<Option<Event>> {
        let conn = self.conn.lock().unwrap();
        events::get_event(&conn, user_id, event_id)
    }

    fn create_event(&self, user_id: &UserId, event: NewEvent) -> Result<Event> {
        let conn = self.conn.lock().unwrap();
        events::create_event(&conn, user_id, event)
    }

    fn update_event(&self, user_id: &UserId, event_id: i64, patch: EventPatch) -> Result<Event> {
        let mut conn = self.conn.lock().unwrap();
        events::update_event(&mut conn, user_id, event_id, patch)
    }

    fn delete_event(&self, user_id: &UserId, event_id: i64) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        events::delete_event(&mut conn, user_id, event_id)
    }

    fn list_upcoming_events(
        &self,
        user_id: &UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        events::list_upcoming_events(&conn, user_id, from, to)
    }

    fn list_busy_intervals(
        &self,
        user_id: &UserId,
        date: NaiveDate,
    ) -> Result<Vec<(NaiveTime, NaiveTime)>> {
        let conn = self.conn.lock().unwrap();
        events::list_busy_intervals(&conn, user_id, date)
    }

    fn list_due_event_reminders(
        &self,
        user_id: &UserId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        events::list_due_event_reminders(&conn, user_id, window_start, window_end)
    }

    fn append_message(
        &self,
        user_id: &UserId,
        role: &str,
        text: &str,
        intent: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conversations::append_message(&conn, user_id, role, text, intent)
    }

    fn list_recent_messages(&self, user_id: &UserId, limit: i64) -> Result<Vec<ConversationMessage>> {
        let conn = self.conn.lock().unwrap();
        conversations::list_recent_messages(&conn, user_id, limit)
    }

    fn get_session_state_raw(&self, user_id: &UserId) -> Result<Option<SessionStateRow>> {
        let conn = self.conn.lock().unwrap();
        session::get_session_state_raw(&conn, user_id)
    }

    fn set_session_state_raw(
        &self,
        user_id: &UserId,
        state: &str,
        state_context: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        session::set_session_state_raw(&conn, user_id, state, state_context)
    }

    fn try_claim_dedup(
        &self,
        user_id: &UserId,
        job_kind: NotificationJobKind,
        key: &str,
        fire_date: NaiveDate,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        dedup::try_claim_dedup(&conn, user_id, job_kind, key, fire_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewEvent, NewGoal, NewStepDraft};
    use waypoint_core::types::{NotificationJobKind, Priority};

    fn goal_with_steps(store: &SqliteStore, user_id: &UserId, n: i64) -> (i64, Vec<i64>) {
        let steps = (1..=n)
            .map(|i| NewStepDraft {
                title: format!("Шаг {i}"),
                order: i,
                estimated_hours: 1.0,
            })
            .collect();
        let (goal, steps) = store
            .create_goal_with_steps(
                user_id,
                NewGoal {
                    title: "Цель".into(),
                    description: None,
                    target_date: None,
                    category: None,
                    priority: Priority::Medium,
                },
                steps,
            )
            .unwrap();
        (goal.goal_id, steps.iter().map(|s| s.step_id).collect())
    }

    /// Invariant 3: within one goal, `order` values are a permutation of
    /// `1..N` with no duplicates, and remain so after `add_step` with no
    /// explicit order.
    #[test]
    fn step_orders_are_a_dense_permutation_after_add_step_defaults() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let (goal_id, _) = goal_with_steps(&store, &user_id, 3);

        store.add_step(&user_id, goal_id, "Добавленный", None, None, None).unwrap();
        let orders: Vec<i64> = store.list_steps(&user_id, goal_id).unwrap().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
    }

    /// Invariant 2: a step's `linked_event_id` points to an event whose own
    /// `linked_step_id` points back; deleting the step clears both sides
    /// atomically, and deleting the event (directly) must do the same in
    /// reverse.
    #[test]
    fn step_event_link_is_symmetric_and_cleared_by_either_side_deleting() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let (goal_id, step_ids) = goal_with_steps(&store, &user_id, 1);
        let step_id = step_ids[0];

        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let time = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let step = store.place_step(&user_id, step_id, date, time, 60).unwrap();
        let event_id = step.linked_event_id.expect("place_step must link an event");
        let event = store.get_event(&user_id, event_id).unwrap().unwrap();
        assert_eq!(event.linked_step_id, Some(step_id));

        // Deleting the step must clear the linked event too.
        assert!(store.delete_step_cascade(&user_id, step_id).unwrap());
        assert!(store.get_event(&user_id, event_id).unwrap().is_none());

        // Re-place, then delete from the event side instead.
        let (_, step_ids2) = goal_with_steps(&store, &user_id, 1);
        let step_id2 = step_ids2[0];
        let step2 = store.place_step(&user_id, step_id2, date, time, 60).unwrap();
        let event_id2 = step2.linked_event_id.unwrap();
        assert!(store.delete_event(&user_id, event_id2).unwrap());
        let step2_after = store.get_step(&user_id, step_id2).unwrap().unwrap();
        assert!(step2_after.linked_event_id.is_none());
        let _ = goal_id;
    }

    /// §4.5 Phase 3.4: `schedule_goal_steps` places every step and flips
    /// `is_scheduled` in one transaction.
    #[test]
    fn schedule_goal_steps_places_every_step_and_marks_the_goal_scheduled() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let (goal_id, step_ids) = goal_with_steps(&store, &user_id, 2);
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let time = NaiveTime::from_hms_opt(10, 0, 0).unwrap();

        let placements = vec![
            crate::models::StepPlacement { step_id: step_ids[0], date, time, duration_minutes: 60 },
            crate::models::StepPlacement {
                step_id: step_ids[1],
                date: date + chrono::Duration::days(1),
                time,
                duration_minutes: 90,
            },
        ];
        let placed = store.schedule_goal_steps(&user_id, goal_id, &placements).unwrap();
        assert_eq!(placed.len(), 2);
        for step in &placed {
            assert!(step.linked_event_id.is_some());
            assert!(step.planned_date.is_some());
        }
        let goal = store.get_goal(&user_id, goal_id).unwrap().unwrap();
        assert!(goal.is_scheduled);
    }

    /// A placement naming a step id that does not exist rolls the whole
    /// batch back: no event is created for the valid placement either, and
    /// the goal is not marked scheduled.
    #[test]
    fn schedule_goal_steps_rolls_back_the_whole_batch_on_a_bad_step_id() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let (goal_id, step_ids) = goal_with_steps(&store, &user_id, 1);
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let time = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let bogus_step_id = step_ids[0] + 999;

        let placements = vec![
            crate::models::StepPlacement { step_id: step_ids[0], date, time, duration_minutes: 60 },
            crate::models::StepPlacement { step_id: bogus_step_id, date, time, duration_minutes: 60 },
        ];
        assert!(store.schedule_goal_steps(&user_id, goal_id, &placements).is_err());

        let step = store.get_step(&user_id, step_ids[0]).unwrap().unwrap();
        assert!(step.linked_event_id.is_none(), "first placement must not survive the rollback");
        let events = store.list_events(&user_id, None, None, None, None, None).unwrap();
        assert!(events.is_empty());
        let goal = store.get_goal(&user_id, goal_id).unwrap().unwrap();
        assert!(!goal.is_scheduled);
    }

    /// Invariant 1 + cascades: deleting a goal removes its steps and any
    /// events those steps linked to, in one transaction.
    #[test]
    fn deleting_a_goal_cascades_through_steps_and_linked_events() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let (goal_id, step_ids) = goal_with_steps(&store, &user_id, 2);
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let time = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let step = store.place_step(&user_id, step_ids[0], date, time, 60).unwrap();
        let event_id = step.linked_event_id.unwrap();

        assert!(store.delete_goal_cascade(&user_id, goal_id).unwrap());
        assert!(store.get_goal(&user_id, goal_id).unwrap().is_none());
        assert!(store.list_steps(&user_id, goal_id).unwrap().is_empty());
        assert!(store.get_event(&user_id, event_id).unwrap().is_none());
    }

    /// A goal with zero steps has progress 0 and stays active.
    #[test]
    fn a_goal_with_zero_steps_has_zero_progress_and_cannot_complete() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let (goal_id, _) = goal_with_steps(&store, &user_id, 0);
        let goal = store.get_goal(&user_id, goal_id).unwrap().unwrap();
        assert_eq!(goal.progress_percent, 0);
        assert_eq!(goal.status, GoalStatus::Active);
    }

    /// Invariant 5: the dedup table prevents more than one emission per
    /// `(user, job_kind, key, date)` per local day, but a new day re-opens
    /// the claim.
    #[test]
    fn dedup_claim_is_once_per_key_per_day_then_reopens_the_next_day() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let day1 = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let day2 = day1 + chrono::Duration::days(1);

        assert!(store.try_claim_dedup(&user_id, NotificationJobKind::GoalDeadline, "goal:1", day1).unwrap());
        assert!(!store.try_claim_dedup(&user_id, NotificationJobKind::GoalDeadline, "goal:1", day1).unwrap());
        assert!(store.try_claim_dedup(&user_id, NotificationJobKind::GoalDeadline, "goal:1", day2).unwrap());
    }
}
