//! The Goal Decomposer & Auto-Scheduler orchestrator: ties Phase 1
//! (decomposition), Phase 2 (availability) and
//! Phase 3 (placement) together and performs the persisted writes.

use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use waypoint_core::types::{Priority, UserId, UserLevel};
use waypoint_store::models::{NewGoal, NewStepDraft, StepPlacement};
use waypoint_store::Store;

use crate::availability::build_available_days;
use crate::decompose::Decomposer;
use crate::error::Result;
use crate::placement::place_steps;

pub struct GoalDraftInput {
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub priority: Priority,
    pub user_level: UserLevel,
    pub time_commitment: Option<u32>,
    pub preferred_weekdays: Vec<u8>,
    pub preferred_time: Option<chrono::NaiveTime>,
}

pub struct ScheduledGoal {
    pub goal_id: i64,
    pub step_count: usize,
    pub tight_deadline: bool,
}

pub struct GoalPlanner {
    store: Arc<dyn Store>,
    decomposer: Decomposer,
}

impl GoalPlanner {
    pub fn new(store: Arc<dyn Store>, decomposer: Decomposer) -> Self {
        Self { store, decomposer }
    }

    /// Runs Phases 1-3 and persists `Goal + Steps + Events` in one pass.
    /// `today` is the user's local today (already resolved by the caller
    /// via `waypoint_context::ContextAssembler::now_for_user`), since the
    /// planner has no timezone dependency of its own.
    pub async fn create_and_schedule(
        &self,
        user_id: &UserId,
        draft: GoalDraftInput,
        today: NaiveDate,
        _tz: Tz,
    ) -> Result<ScheduledGoal> {
        let steps = self
            .decomposer
            .decompose(
                &draft.title,
                draft.description.as_deref(),
                draft.target_date,
                draft.user_level,
                draft.time_commitment,
            )
            .await;

        let new_goal = NewGoal {
            title: draft.title.clone(),
            description: draft.description.clone(),
            target_date: draft.target_date,
            category: draft.category.clone(),
            priority: draft.priority,
        };
        let step_drafts: Vec<NewStepDraft> = steps
            .iter()
            .map(|s| NewStepDraft {
                title: s.title.clone(),
                order: s.order,
                estimated_hours: s.estimated_hours,
            })
            .collect();

        let (goal, persisted_steps) = self
            .store
            .create_goal_with_steps(user_id, new_goal, step_drafts)?;

        let available_days =
            build_available_days(today, draft.target_date, &draft.preferred_weekdays);
        let preferred_hour = draft
            .preferred_time
            .unwrap_or_else(|| chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap());

        let store = Arc::clone(&self.store);
        let user_for_lookup = user_id.clone();
        let plan = place_steps(
            &available_days,
            preferred_hour,
            draft.target_date,
            &steps,
            move |day| {
                store
                    .list_busy_intervals(&user_for_lookup, day)
                    .unwrap_or_default()
            },
        );

        // §4.5 Phase 3.4: every placement plus `is_scheduled` commits or
        // rolls back as one unit, so a mid-batch failure never leaves the
        // goal half-scheduled.
        let batch: Vec<StepPlacement> = plan
            .placements
            .iter()
            .filter_map(|placement| {
                persisted_steps
                    .iter()
                    .find(|s| s.order == placement.step_order)
                    .map(|step| StepPlacement {
                        step_id: step.step_id,
                        date: placement.date,
                        time: placement.time,
                        duration_minutes: placement.duration_minutes,
                    })
            })
            .collect();
        self.store
            .schedule_goal_steps(user_id, goal.goal_id, &batch)?;

        Ok(ScheduledGoal {
            goal_id: goal.goal_id,
            step_count: persisted_steps.len(),
            tight_deadline: plan.tight_deadline,
        })
    }

    /// Idempotence guard: re-running Phase 3 for an already-scheduled
    /// goal is a no-op. Callers check this before invoking
    /// `create_and_schedule` a second time for the same goal id.
    pub fn is_already_scheduled(&self, user_id: &UserId, goal_id: i64) -> Result<bool> {
        let goal = self.store.get_goal(user_id, goal_id)?;
        Ok(goal.map(|g| g.is_scheduled).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use waypoint_core::model::{ModelAdapter, ModelAdapterError};
    use waypoint_core::types::UserLevel;
    use waypoint_store::SqliteStore;

    struct FixedDecomposition(&'static str);

    #[async_trait]
    impl ModelAdapter for FixedDecomposition {
        async fn complete(
            &self,
            _prompt: &str,
            _temperature: f32,
            _timeout: std::time::Duration,
        ) -> std::result::Result<String, ModelAdapterError> {
            Ok(self.0.to_string())
        }
    }

    fn planner_with(raw_decomposition: &'static str) -> (GoalPlanner, Arc<dyn Store>) {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let model: Arc<dyn waypoint_core::model::ModelAdapter> = Arc::new(FixedDecomposition(raw_decomposition));
        let decomposer = Decomposer::new(model, 0.2, 20_000);
        (GoalPlanner::new(Arc::clone(&store), decomposer), store)
    }

    const THREE_STEPS: &str = r#"{"steps":[
        {"title":"Основы грамматики","estimated_hours":10,"order":1},
        {"title":"Базовая лексика","estimated_hours":8,"order":2},
        {"title":"Разговорная практика","estimated_hours":6,"order":3}
    ]}"#;

    /// S1 — goal creation with decomposition: steps land on the preferred
    /// weekdays at (or after, on conflict) the preferred hour, and each
    /// ends up bidirectionally linked to a `goal_step` event.
    #[tokio::test]
    async fn scheduled_steps_land_on_preferred_weekdays_with_bidirectional_links() {
        let (planner, store) = planner_with(THREE_STEPS);
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();

        // 2026-08-03 is a Monday.
        let today = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
        let draft = GoalDraftInput {
            title: "Выучить испанский".into(),
            description: None,
            target_date: NaiveDate::from_ymd_opt(2026, 11, 1),
            category: None,
            priority: Priority::Medium,
            user_level: UserLevel::Beginner,
            time_commitment: Some(180),
            preferred_weekdays: vec![0, 2, 4], // Mon, Wed, Fri
            preferred_time: chrono::NaiveTime::from_hms_opt(18, 0, 0),
        };

        let scheduled = planner
            .create_and_schedule(&user_id, draft, today, chrono_tz::Europe::Moscow)
            .await
            .unwrap();
        assert_eq!(scheduled.step_count, 3);
        assert!(!scheduled.tight_deadline);

        let steps = store.list_steps(&user_id, scheduled.goal_id).unwrap();
        assert_eq!(steps.len(), 3);
        for step in &steps {
            let date = step.planned_date.expect("step must be scheduled");
            use chrono::Datelike;
            assert!([0u8, 2, 4].contains(&(date.weekday().num_days_from_monday() as u8)));
            let event_id = step.linked_event_id.expect("step must link to an event");
            let event = store.get_event(&user_id, event_id).unwrap().unwrap();
            assert_eq!(event.linked_step_id, Some(step.step_id));
            assert_eq!(event.event_type, waypoint_core::types::EventType::GoalStep);
        }

        let goal = store.get_goal(&user_id, scheduled.goal_id).unwrap().unwrap();
        assert!(goal.is_scheduled);
    }

    /// S6 — tight deadline: a target date of "today" plus coarse weekday
    /// availability (only Mondays, 7 days apart) and enough total estimated
    /// hours to overflow a single day forces some steps onto the next
    /// available Monday, past `target_date`; the goal still persists with
    /// `is_scheduled=true` and the plan is flagged.
    #[tokio::test]
    async fn a_tight_deadline_still_schedules_everything_but_flags_the_advisory() {
        const SIX_STEPS: &str = r#"{"steps":[
            {"title":"A","estimated_hours":3,"order":1},
            {"title":"B","estimated_hours":3,"order":2},
            {"title":"C","estimated_hours":3,"order":3},
            {"title":"D","estimated_hours":3,"order":4},
            {"title":"E","estimated_hours":3,"order":5},
            {"title":"F","estimated_hours":3,"order":6}
        ]}"#;
        let (planner, store) = planner_with(SIX_STEPS);
        let user_id = UserId::from("u2");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();

        // 2026-08-03 is a Monday; the deadline is today itself, so only the
        // first Monday's placements are on time and the next Monday (the
        // only other available day in the window) is already late.
        let today = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
        let draft = GoalDraftInput {
            title: "Срочная цель".into(),
            description: None,
            target_date: Some(today),
            category: None,
            priority: Priority::High,
            user_level: UserLevel::Beginner,
            time_commitment: None,
            preferred_weekdays: vec![0], // only Mondays — one day every 7
            preferred_time: chrono::NaiveTime::from_hms_opt(9, 0, 0),
        };

        let scheduled = planner
            .create_and_schedule(&user_id, draft, today, chrono_tz::Europe::Moscow)
            .await
            .unwrap();
        assert_eq!(scheduled.step_count, 6);
        assert!(scheduled.tight_deadline, "6 * 3h can't fit on a single day, forcing overflow past the deadline");
        let goal = store.get_goal(&user_id, scheduled.goal_id).unwrap().unwrap();
        assert!(goal.is_scheduled, "goal persists even when placement overruns the deadline");
    }

    #[tokio::test]
    async fn is_already_scheduled_reflects_the_goal_flag() {
        let (planner, store) = planner_with(THREE_STEPS);
        let user_id = UserId::from("u3");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
        let draft = GoalDraftInput {
            title: "Цель".into(),
            description: None,
            target_date: None,
            category: None,
            priority: Priority::Medium,
            user_level: UserLevel::Beginner,
            time_commitment: None,
            preferred_weekdays: vec![],
            preferred_time: None,
        };
        let scheduled = planner
            .create_and_schedule(&user_id, draft, today, chrono_tz::Europe::Moscow)
            .await
            .unwrap();
        assert!(planner.is_already_scheduled(&user_id, scheduled.goal_id).unwrap());
    }
}
