//! The Context Assembler. Read-only:
//! never calls the model, degrades by omitting optional slots rather than
//! aborting when the store errors on a non-essential query — a plain
//! read-then-render shape over the store's own queries.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::warn;
use waypoint_core::time::{format_minute_precision, now_in_tz, parse_timezone};
use waypoint_core::types::UserId;
use waypoint_store::Store;

use crate::bundle::{
    EventSummarySlot, GoalSummarySlot, HistoryTurnSlot, PromptBundle, HISTORY_TURNS,
    MAX_ACTIVE_GOALS, UPCOMING_EVENTS_DAYS,
};
use crate::error::Result;

pub struct ContextAssembler {
    store: Arc<dyn Store>,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Build the per-turn prompt bundle. `state_context` is the serialized
    /// dialog state context, already resolved by the caller (the Dialog
    /// State Machine owns the state itself; the assembler only carries it).
    pub fn assemble(&self, user_id: &UserId, state_context: Option<String>) -> Result<PromptBundle> {
        let profile = self.store.get_profile(user_id)?;
        let (user_name, timezone_name) = match &profile {
            Some(p) => (p.chat_id.clone(), p.timezone.clone()),
            None => ("друг".to_string(), waypoint_core::config::DEFAULT_TIMEZONE.to_string()),
        };
        let tz = parse_timezone(&timezone_name).unwrap_or(chrono_tz::Europe::Moscow);
        let now_utc = Utc::now();
        let now_label = format_minute_precision(now_utc, tz);

        let active_goals = self
            .store
            .list_active_goals_for_context(user_id, MAX_ACTIVE_GOALS)
            .map(|goals| {
                goals
                    .into_iter()
                    .map(|g| GoalSummarySlot {
                        title: g.title,
                        progress_percent: g.progress_percent,
                        target_date: g.target_date,
                    })
                    .collect()
            })
            .unwrap_or_else(|e| {
                warn!(error = %e, "context assembler: degraded — active_goals omitted");
                Vec::new()
            });

        let upcoming_events = self
            .store
            .list_upcoming_events(user_id, now_utc, now_utc + Duration::days(UPCOMING_EVENTS_DAYS))
            .map(|events| {
                events
                    .into_iter()
                    .map(|e| {
                        let when_local = match e.time {
                            Some(t) => format!("{} {}", e.date.format("%Y-%m-%d"), t.format("%H:%M")),
                            None => format!("{} (весь день)", e.date.format("%Y-%m-%d")),
                        };
                        EventSummarySlot {
                            title: e.title,
                            when_local,
                        }
                    })
                    .collect()
            })
            .unwrap_or_else(|e| {
                warn!(error = %e, "context assembler: degraded — upcoming_events omitted");
                Vec::new()
            });

        let conversation_history = self
            .store
            .list_recent_messages(user_id, HISTORY_TURNS)
            .map(|msgs| {
                msgs.into_iter()
                    .map(|m| HistoryTurnSlot {
                        role: m.role,
                        text: m.text,
                    })
                    .collect()
            })
            .unwrap_or_else(|e| {
                warn!(error = %e, "context assembler: degraded — conversation_history omitted");
                Vec::new()
            });

        Ok(PromptBundle {
            user_name,
            timezone: timezone_name,
            now: now_label,
            active_goals,
            upcoming_events,
            conversation_history,
            state_context,
        })
    }

    /// The instant "now" would be rendered at, in the user's own timezone —
    /// a convenience for callers (planner, notify) that need the same
    /// `now_in_tz` the assembler used without re-deriving it.
    pub fn now_for_user(&self, user_id: &UserId) -> Result<chrono::DateTime<chrono_tz::Tz>> {
        let tz_name = self
            .store
            .get_profile(user_id)?
            .map(|p| p.timezone)
            .unwrap_or_else(|| waypoint_core::config::DEFAULT_TIMEZONE.to_string());
        let tz = parse_timezone(&tz_name).unwrap_or(chrono_tz::Europe::Moscow);
        Ok(now_in_tz(tz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_store::models::{NewEvent, NewGoal};
    use waypoint_store::SqliteStore;

    fn assembler() -> (ContextAssembler, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        (ContextAssembler::new(Arc::clone(&store) as Arc<dyn Store>), store)
    }

    /// Every slot is populated when the store has data for it.
    #[test]
    fn assemble_fills_every_slot_from_the_store() {
        let (assembler, store) = assembler();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "Аня", "Europe/Moscow").unwrap();
        store
            .create_goal_with_steps(
                &user_id,
                NewGoal {
                    title: "Выучить испанский".into(),
                    description: None,
                    target_date: None,
                    category: None,
                    priority: waypoint_core::types::Priority::Medium,
                },
                vec![],
            )
            .unwrap();
        store
            .create_event(
                &user_id,
                NewEvent {
                    title: "Встреча".into(),
                    date: Utc::now().date_naive(),
                    ..Default::default()
                },
            )
            .unwrap();
        store.append_message(&user_id, "user", "Привет", None).unwrap();

        let bundle = assembler.assemble(&user_id, None).unwrap();
        assert_eq!(bundle.user_name, "Аня");
        assert_eq!(bundle.timezone, "Europe/Moscow");
        assert_eq!(bundle.active_goals.len(), 1);
        assert_eq!(bundle.conversation_history.len(), 1);
    }

    /// With no profile row, the bundle falls back to a default name/timezone
    /// rather than erroring.
    #[test]
    fn assemble_degrades_to_defaults_when_the_user_has_no_profile() {
        let (assembler, _store) = assembler();
        let user_id = UserId::from("ghost");
        let bundle = assembler.assemble(&user_id, None).unwrap();
        assert_eq!(bundle.user_name, "друг");
        assert_eq!(bundle.timezone, waypoint_core::config::DEFAULT_TIMEZONE);
        assert!(bundle.active_goals.is_empty());
        assert!(bundle.upcoming_events.is_empty());
    }

    #[test]
    fn assemble_carries_the_state_context_through_unchanged() {
        let (assembler, store) = assembler();
        let user_id = UserId::from("u2");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let bundle = assembler.assemble(&user_id, Some("{\"k\":1}".to_string())).unwrap();
        assert_eq!(bundle.state_context.as_deref(), Some("{\"k\":1}"));
    }
}
