//! The Dialog State Machine: decides
//! whether an inbound message or callback belongs to a multi-turn sub-flow
//! rather than a fresh intent, and owns the `state_context` JSON bag for
//! whichever sub-flow is active. A single-row-per-user read-modify-write
//! shape, generalized from "one session blob" to "one state label plus one
//! context bag".

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use waypoint_core::types::{Priority, UserId, UserLevel};
use waypoint_store::Store;

use crate::callback::Callback;
use crate::error::{DialogError, Result};
use crate::smart::{validate_smart, GoalDraft, SmartFailure};
use crate::state::{DialogState, EventEditField, GoalEditField, StepEditField};

/// How long a non-idle state survives without activity before the next
/// inbound message silently resets it (§4.4).
const STATE_TIMEOUT_MINUTES: i64 = 30;

/// The goal draft accumulated through `GOAL_CLARIFICATION` and the two
/// `SCHEDULE_PREFS_*` states, serialized into `state_context`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoalDraftContext {
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub user_level: Option<UserLevel>,
    pub time_commitment: Option<u32>,
    #[serde(default)]
    pub preferred_days: Vec<u8>,
    #[serde(default)]
    pub preferred_time: Option<String>,
}

impl GoalDraftContext {
    fn as_smart_draft(&self) -> GoalDraft {
        GoalDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            has_target_date: self.target_date.is_some(),
        }
    }
}

/// What happened as a result of feeding one turn into the engine.
#[derive(Debug, Clone)]
pub enum DialogOutcome {
    /// The message/callback did not belong to any sub-flow; handle it as a
    /// fresh intent.
    NotHandled,
    Cancelled,
    EnteredClarification { follow_up: String },
    ClarificationStillFailing { follow_up: String },
    EnteredSchedulePrefsDays,
    DayPrefToggled { days: Vec<u8> },
    EnteredSchedulePrefsTime,
    /// Both schedule preference sub-flows are done; the caller (dispatch)
    /// hands the draft to the Goal Decomposer.
    ReadyForDecomposition(GoalDraftContext),
    EnteredEditState(DialogState),
    /// A free-text reply resolved a `*_EDIT_*` state: the caller applies
    /// this to the store and returns to `IDLE`.
    FieldEdited {
        entity: String,
        id: i64,
        field: String,
        new_value: String,
    },
}

pub struct DialogEngine {
    store: Arc<dyn Store>,
}

impl DialogEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Loads the user's current state, applying the 30-minute timeout reset
    /// (§4.4) before returning it. This is the entry point every other
    /// method in this engine calls first.
    pub fn load_effective_state(&self, user_id: &UserId) -> Result<(DialogState, Value)> {
        let row = self.store.get_session_state_raw(user_id)?;
        let Some(row) = row else {
            return Ok((DialogState::Idle, Value::Null));
        };
        let state: DialogState = row
            .state
            .parse()
            .map_err(DialogError::MalformedStateContext)?;
        if state.is_idle() {
            return Ok((DialogState::Idle, Value::Null));
        }
        if Utc::now() - row.updated_at > Duration::minutes(STATE_TIMEOUT_MINUTES) {
            self.reset_to_idle(user_id)?;
            return Ok((DialogState::Idle, Value::Null));
        }
        let context: Value = if row.state_context.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&row.state_context)?
        };
        Ok((state, context))
    }

    fn reset_to_idle(&self, user_id: &UserId) -> Result<()> {
        self.store
            .set_session_state_raw(user_id, &DialogState::Idle.to_string(), "")?;
        Ok(())
    }

    fn save(&self, user_id: &UserId, state: DialogState, context: &impl Serialize) -> Result<()> {
        let ctx = serde_json::to_string(context)?;
        self.store.set_session_state_raw(user_id, &state.to_string(), &ctx)?;
        Ok(())
    }

    /// A reserved `cancel` callback discards `state_context` from any
    /// non-idle state (§4.4).
    pub fn cancel(&self, user_id: &UserId) -> Result<DialogOutcome> {
        self.reset_to_idle(user_id)?;
        Ok(DialogOutcome::Cancelled)
    }

    /// `goal.create` entry point: validates the draft via SMART; on failure
    /// enters `GOAL_CLARIFICATION`, on success enters `SCHEDULE_PREFS_DAYS`.
    pub fn start_goal_creation(&self, user_id: &UserId, draft: GoalDraftContext) -> Result<DialogOutcome> {
        match validate_smart(&draft.as_smart_draft()) {
            Ok(()) => {
                self.save(user_id, DialogState::SchedulePrefsDays, &draft)?;
                Ok(DialogOutcome::EnteredSchedulePrefsDays)
            }
            Err(SmartFailure { follow_up, .. }) => {
                self.save(user_id, DialogState::GoalClarification, &draft)?;
                Ok(DialogOutcome::EnteredClarification {
                    follow_up: follow_up.to_string(),
                })
            }
        }
    }

    /// A free-text reply while in `GOAL_CLARIFICATION`: the heuristic simply
    /// folds the reply into whichever field looks emptiest, then
    /// revalidates — SMART validation is a cheap heuristic rather than a
    /// slot-filling NLU pass.
    pub fn continue_goal_clarification(&self, user_id: &UserId, reply: &str) -> Result<DialogOutcome> {
        let (state, context) = self.load_effective_state(user_id)?;
        if state != DialogState::GoalClarification {
            return Ok(DialogOutcome::NotHandled);
        }
        let mut draft: GoalDraftContext = serde_json::from_value(context)?;
        fold_reply_into_draft(&mut draft, reply);

        match validate_smart(&draft.as_smart_draft()) {
            Ok(()) => {
                self.save(user_id, DialogState::SchedulePrefsDays, &draft)?;
                Ok(DialogOutcome::EnteredSchedulePrefsDays)
            }
            Err(SmartFailure { follow_up, .. }) => {
                self.save(user_id, DialogState::GoalClarification, &draft)?;
                Ok(DialogOutcome::ClarificationStillFailing {
                    follow_up: follow_up.to_string(),
                })
            }
        }
    }

    pub fn handle_day_pref(&self, user_id: &UserId, day: u8) -> Result<DialogOutcome> {
        let (state, context) = self.load_effective_state(user_id)?;
        if state != DialogState::SchedulePrefsDays {
            return Ok(DialogOutcome::NotHandled);
        }
        let mut draft: GoalDraftContext = serde_json::from_value(context)?;
        if !draft.preferred_days.contains(&day) {
            draft.preferred_days.push(day);
            draft.preferred_days.sort_unstable();
        }
        let days = draft.preferred_days.clone();
        self.save(user_id, DialogState::SchedulePrefsDays, &draft)?;
        Ok(DialogOutcome::DayPrefToggled { days })
    }

    pub fn handle_day_pref_done(&self, user_id: &UserId) -> Result<DialogOutcome> {
        let (state, context) = self.load_effective_state(user_id)?;
        if state != DialogState::SchedulePrefsDays {
            return Ok(DialogOutcome::NotHandled);
        }
        let draft: GoalDraftContext = serde_json::from_value(context)?;
        self.save(user_id, DialogState::SchedulePrefsTime, &draft)?;
        Ok(DialogOutcome::EnteredSchedulePrefsTime)
    }

    pub fn handle_time_pref(&self, user_id: &UserId, token: &str) -> Result<DialogOutcome> {
        let (state, context) = self.load_effective_state(user_id)?;
        if state != DialogState::SchedulePrefsTime {
            return Ok(DialogOutcome::NotHandled);
        }
        let mut draft: GoalDraftContext = serde_json::from_value(context)?;
        draft.preferred_time = Some(resolve_time_token(token));
        self.save(user_id, DialogState::SchedulePrefsTime, &draft)?;
        Ok(DialogOutcome::EnteredSchedulePrefsTime)
    }

    /// Completion of `SCHEDULE_PREFS_TIME` triggers the Scheduler (§4.4) and
    /// returns to `IDLE`.
    pub fn handle_time_pref_done(&self, user_id: &UserId) -> Result<DialogOutcome> {
        let (state, context) = self.load_effective_state(user_id)?;
        if state != DialogState::SchedulePrefsTime {
            return Ok(DialogOutcome::NotHandled);
        }
        let draft: GoalDraftContext = serde_json::from_value(context)?;
        self.reset_to_idle(user_id)?;
        Ok(DialogOutcome::ReadyForDecomposition(draft))
    }

    /// `edit:<entity>:<field>:<id>` enters the matching `*_EDIT_*` state
    /// (§4.4).
    pub fn enter_edit(&self, user_id: &UserId, entity: &str, field: &str, id: i64) -> Result<DialogOutcome> {
        let target = match entity {
            "goal" => goal_edit_state(field),
            "event" => event_edit_state(field),
            "step" => step_edit_state(field),
            _ => None,
        };
        let Some(state) = target else {
            return Ok(DialogOutcome::NotHandled);
        };
        let context = serde_json::json!({ "entity": entity, "id": id });
        self.save(user_id, state, &context)?;
        Ok(DialogOutcome::EnteredEditState(state))
    }

    /// The next free-text message while in any `*_EDIT_*` state is consumed
    /// as the new field value; the state returns to `IDLE` (§4.4). The
    /// actual store write is left to the caller, which knows how to map
    /// `(entity, field, new_value)` onto the right `*Patch` type.
    pub fn apply_edit_reply(&self, user_id: &UserId, text: &str) -> Result<DialogOutcome> {
        let (state, context) = self.load_effective_state(user_id)?;
        let field = match state {
            DialogState::GoalEdit(f) => goal_edit_field_name(f),
            DialogState::EventEdit(f) => event_edit_field_name(f),
            DialogState::StepEdit(f) => step_edit_field_name(f),
            _ => return Ok(DialogOutcome::NotHandled),
        };
        let entity = context
            .get("entity")
            .and_then(Value::as_str)
            .ok_or_else(|| DialogError::MalformedStateContext("missing entity".into()))?
            .to_string();
        let id = context
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| DialogError::MalformedStateContext("missing id".into()))?;
        self.reset_to_idle(user_id)?;
        Ok(DialogOutcome::FieldEdited {
            entity,
            id,
            field: field.to_string(),
            new_value: text.trim().to_string(),
        })
    }

    pub fn handle_callback(&self, user_id: &UserId, callback: &Callback) -> Result<DialogOutcome> {
        match callback {
            Callback::Cancel => self.cancel(user_id),
            Callback::Edit { entity, field, id } => self.enter_edit(user_id, entity, field, *id),
            Callback::DayPref(n) => self.handle_day_pref(user_id, *n),
            Callback::DayPrefDone => self.handle_day_pref_done(user_id),
            Callback::TimePref(token) => self.handle_time_pref(user_id, token),
            Callback::TimePrefDone => self.handle_time_pref_done(user_id),
            Callback::Confirm { .. } => Ok(DialogOutcome::NotHandled),
        }
    }
}

fn goal_edit_state(field: &str) -> Option<DialogState> {
    Some(DialogState::GoalEdit(match field {
        "title" => GoalEditField::Title,
        "description" => GoalEditField::Description,
        "deadline" => GoalEditField::Deadline,
        "category" => GoalEditField::Category,
        "priority" => GoalEditField::Priority,
        _ => return None,
    }))
}

fn event_edit_state(field: &str) -> Option<DialogState> {
    Some(DialogState::EventEdit(match field {
        "title" => EventEditField::Title,
        "date" => EventEditField::Date,
        "time" => EventEditField::Time,
        "duration" => EventEditField::Duration,
        "notes" => EventEditField::Notes,
        _ => return None,
    }))
}

fn step_edit_state(field: &str) -> Option<DialogState> {
    Some(DialogState::StepEdit(match field {
        "title" => StepEditField::Title,
        "date" => StepEditField::Date,
        "time" => StepEditField::Time,
        _ => return None,
    }))
}

fn goal_edit_field_name(f: GoalEditField) -> &'static str {
    match f {
        GoalEditField::Title => "title",
        GoalEditField::Description => "description",
        GoalEditField::Deadline => "deadline",
        GoalEditField::Category => "category",
        GoalEditField::Priority => "priority",
    }
}

fn event_edit_field_name(f: EventEditField) -> &'static str {
    match f {
        EventEditField::Title => "title",
        EventEditField::Date => "date",
        EventEditField::Time => "time",
        EventEditField::Duration => "duration",
        EventEditField::Notes => "notes",
    }
}

fn step_edit_field_name(f: StepEditField) -> &'static str {
    match f {
        StepEditField::Title => "title",
        StepEditField::Date => "date",
        StepEditField::Time => "time",
    }
}

/// Folds a free-text clarification reply into whichever draft field SMART
/// flagged as missing: no deadline yet → try to read it as a date or append
/// to the description (where a duration phrase might live); otherwise
/// append to the description.
fn fold_reply_into_draft(draft: &mut GoalDraftContext, reply: &str) {
    if draft.target_date.is_none() {
        if let Ok(date) = NaiveDate::parse_from_str(reply.trim(), "%Y-%m-%d") {
            draft.target_date = Some(date);
            return;
        }
    }
    draft.description = Some(match &draft.description {
        Some(existing) => format!("{existing} {reply}"),
        None => reply.to_string(),
    });
}

/// Maps the named slots to default clock hours, or parses an explicit
/// `HH:MM` through unchanged (§4.4).
fn resolve_time_token(token: &str) -> String {
    match token {
        "morning" => "09:00".to_string(),
        "afternoon" => "14:00".to_string(),
        "evening" => "19:00".to_string(),
        explicit => explicit.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_store::SqliteStore;

    fn engine() -> DialogEngine {
        DialogEngine::new(Arc::new(SqliteStore::in_memory().unwrap()))
    }

    #[test]
    fn vague_goal_enters_clarification() {
        let engine = engine();
        let user_id = UserId::from("u1");
        let draft = GoalDraftContext {
            title: "спорт".to_string(),
            ..Default::default()
        };
        let outcome = engine.start_goal_creation(&user_id, draft).unwrap();
        assert!(matches!(outcome, DialogOutcome::EnteredClarification { .. }));
        let (state, _) = engine.load_effective_state(&user_id).unwrap();
        assert_eq!(state, DialogState::GoalClarification);
    }

    #[test]
    fn smart_goal_goes_straight_to_schedule_prefs() {
        let engine = engine();
        let user_id = UserId::from("u2");
        let draft = GoalDraftContext {
            title: "Выучить испанский язык".to_string(),
            target_date: NaiveDate::from_ymd_opt(2026, 12, 31),
            ..Default::default()
        };
        let outcome = engine.start_goal_creation(&user_id, draft).unwrap();
        assert!(matches!(outcome, DialogOutcome::EnteredSchedulePrefsDays));
    }

    #[test]
    fn full_schedule_prefs_round_trip() {
        let engine = engine();
        let user_id = UserId::from("u3");
        let draft = GoalDraftContext {
            title: "Выучить испанский язык".to_string(),
            target_date: NaiveDate::from_ymd_opt(2026, 12, 31),
            ..Default::default()
        };
        engine.start_goal_creation(&user_id, draft).unwrap();
        engine.handle_day_pref(&user_id, 0).unwrap();
        engine.handle_day_pref(&user_id, 2).unwrap();
        let outcome = engine.handle_day_pref_done(&user_id).unwrap();
        assert!(matches!(outcome, DialogOutcome::EnteredSchedulePrefsTime));
        engine.handle_time_pref(&user_id, "morning").unwrap();
        let outcome = engine.handle_time_pref_done(&user_id).unwrap();
        match outcome {
            DialogOutcome::ReadyForDecomposition(draft) => {
                assert_eq!(draft.preferred_days, vec![0, 2]);
                assert_eq!(draft.preferred_time.as_deref(), Some("09:00"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let (state, _) = engine.load_effective_state(&user_id).unwrap();
        assert_eq!(state, DialogState::Idle);
    }

    /// S5 — state timeout: a row whose `updated_at` is more than 30 minutes
    /// old is treated as idle on the very next read, and the reset is
    /// persisted (not just reported once).
    #[test]
    fn a_stale_non_idle_state_silently_resets_to_idle_after_the_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waypoint.sqlite3");
        let path_str = path.to_str().unwrap().to_string();

        let store = Arc::new(SqliteStore::open(&path_str).unwrap());
        let engine = DialogEngine::new(Arc::clone(&store) as Arc<dyn Store>);
        let user_id = UserId::from("u6");
        engine.enter_edit(&user_id, "goal", "title", 1).unwrap();
        let (state, _) = engine.load_effective_state(&user_id).unwrap();
        assert_ne!(state, DialogState::Idle, "sanity check: edit state is active right after entry");

        // Back-date the row by hand through a second raw connection to the
        // same file, simulating 31 minutes of inactivity.
        let stale = Utc::now() - Duration::minutes(31);
        let raw = rusqlite::Connection::open(&path_str).unwrap();
        raw.execute(
            "UPDATE session_states SET updated_at = ?1 WHERE user_id = ?2",
            rusqlite::params![stale.to_rfc3339(), user_id.as_str()],
        )
        .unwrap();
        drop(raw);

        let (state, context) = engine.load_effective_state(&user_id).unwrap();
        assert_eq!(state, DialogState::Idle);
        assert_eq!(context, Value::Null);

        // The reset must be persisted, not merely reported for this call.
        let row = store.get_session_state_raw(&user_id).unwrap().unwrap();
        assert_eq!(row.state, DialogState::Idle.to_string());
    }

    #[test]
    fn cancel_resets_from_any_state() {
        let engine = engine();
        let user_id = UserId::from("u4");
        engine.enter_edit(&user_id, "goal", "title", 1).unwrap();
        engine.cancel(&user_id).unwrap();
        let (state, _) = engine.load_effective_state(&user_id).unwrap();
        assert_eq!(state, DialogState::Idle);
    }

    #[test]
    fn edit_reply_resolves_field_and_resets_to_idle() {
        let engine = engine();
        let user_id = UserId::from("u5");
        engine.enter_edit(&user_id, "goal", "title", 7).unwrap();
        let outcome = engine.apply_edit_reply(&user_id, "Новое название").unwrap();
        match outcome {
            DialogOutcome::FieldEdited { entity, id, field, new_value } => {
                assert_eq!(entity, "goal");
                assert_eq!(id, 7);
                assert_eq!(field, "title");
                assert_eq!(new_value, "Новое название");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let (state, _) = engine.load_effective_state(&user_id).unwrap();
        assert_eq!(state, DialogState::Idle);
    }
}
