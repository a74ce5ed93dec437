//! Every `goal.*` intent except `goal.create`, which is a multi-turn
//! sub-flow owned by the orchestrator (clarification → schedule prefs →
//! decomposition) rather than a single store write.

use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};
use waypoint_core::transport::Button;
use waypoint_core::types::{ResultKind, StepStatus, UserId};
use waypoint_intent::intent::{GoalAddStepParams, GoalDeleteParams, GoalDeleteStepParams, GoalQueryParams, GoalSearchParams, GoalUpdateStepParams};
use waypoint_resultcache::ResultSetCache;
use waypoint_store::Store;

use crate::error::{DispatchError, Result};
use crate::response::ProcessResponse;

use super::resolve_target;

/// Returns all goals filtered by `status` and creates a Result Set.
pub fn search(store: &dyn Store, cache: &ResultSetCache, user_id: &UserId, params: &GoalSearchParams) -> Result<ProcessResponse> {
    let goals = store.list_goals(user_id, params.status)?;
    let ids: Vec<i64> = goals.iter().map(|g| g.goal_id).collect();
    let set_id = cache.put(user_id, ResultKind::Goals, ids);
    let text = if goals.is_empty() {
        "Активных целей нет.".to_string()
    } else {
        format!("Нашёл {} цель(ей).", goals.len())
    };
    let items = serde_json::to_value(&goals).map_err(|_| DispatchError::InvalidParams("goal serialization failed".into()))?;
    Ok(ProcessResponse::render_table(text, items, set_id))
}

/// Cascades through steps and their linked events in one transaction.
/// Honors `dry_run` by previewing the cascade and offering a
/// `confirm:goal.delete:<id>` button — the id alone is enough to redo the
/// delete, so this is the one variant where dry-run and confirm round-trip
/// cleanly through the callback grammar.
pub fn delete(store: &dyn Store, cache: &ResultSetCache, user_id: &UserId, params: &GoalDeleteParams) -> Result<ProcessResponse> {
    let goal_id = resolve_target(cache, user_id, &params.target)?;
    if params.dry_run {
        let Some(goal) = store.get_goal(user_id, goal_id)? else {
            return Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::ReferencesUnknownEntity));
        };
        let steps = store.list_steps(user_id, goal_id)?;
        let text = format!(
            "Удалить цель «{}» вместе с {} шагами? Это действие необратимо.",
            goal.title,
            steps.len()
        );
        return Ok(ProcessResponse::ask_clarification_with_buttons(text, confirm_buttons("goal.delete", goal_id)));
    }
    let deleted = store.delete_goal_cascade(user_id, goal_id)?;
    if deleted {
        Ok(ProcessResponse::final_text("Цель удалена."))
    } else {
        Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::ReferencesUnknownEntity))
    }
}

/// Returns the goal plus all steps ordered by `order`. The step
/// list is also registered as a Result Set of kind `steps`, required for
/// `goal.update_step`/`goal.delete_step` ordinal addressing ("mark the
/// second step done") to have anything to resolve against; recorded as a
/// resolved gap in the design ledger.
pub fn query(store: &dyn Store, cache: &ResultSetCache, user_id: &UserId, params: &GoalQueryParams) -> Result<ProcessResponse> {
    let goal_id = resolve_target(cache, user_id, &params.target)?;
    let Some(goal) = store.get_goal(user_id, goal_id)? else {
        return Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::ReferencesUnknownEntity));
    };
    let steps = store.list_steps(user_id, goal_id)?;
    let ids: Vec<i64> = steps.iter().map(|s| s.step_id).collect();
    let set_id = cache.put(user_id, ResultKind::Steps, ids);
    let text = format!(
        "«{}»: {}% готово, {} шаг(ов).",
        goal.title,
        goal.progress_percent,
        steps.len()
    );
    let items = serde_json::json!({ "goal": goal, "steps": steps });
    Ok(ProcessResponse::render_table(text, items, set_id))
}

/// Transitions step `status`, recomputes the parent goal's `progress_percent`,
/// and sets goal `status=completed` once every step is complete. The store's
/// `update_step_status` already performs the recompute atomically.
pub fn update_step(store: &dyn Store, cache: &ResultSetCache, user_id: &UserId, params: &GoalUpdateStepParams) -> Result<ProcessResponse> {
    let step_id = resolve_target(cache, user_id, &params.target)?;
    if params.dry_run {
        let Some(step) = store.get_step(user_id, step_id)? else {
            return Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::ReferencesUnknownEntity));
        };
        return Ok(ProcessResponse::ask_clarification(format!(
            "Отметить шаг «{}» как {}?",
            step.title,
            status_label(params.new_status)
        )));
    }
    match store.update_step_status(user_id, step_id, params.new_status) {
        Ok(goal) => Ok(ProcessResponse::final_text(format!(
            "Готово. Прогресс цели «{}»: {}%.",
            goal.title, goal.progress_percent
        ))),
        Err(e) => Ok(ProcessResponse::from_taxonomy(e.taxonomy())),
    }
}

/// Appends with `order = max(order)+1` unless specified; if
/// `planned_date` is provided, also creates a linked Event.
pub fn add_step(store: &dyn Store, _cache: &ResultSetCache, user_id: &UserId, params: &GoalAddStepParams) -> Result<ProcessResponse> {
    if params.title.trim().is_empty() {
        return Err(DispatchError::InvalidParams("goal.add_step title is empty".into()));
    }
    if params.dry_run {
        return Ok(ProcessResponse::ask_clarification(format!(
            "Добавить шаг «{}» к цели #{}?",
            params.title, params.goal_id
        )));
    }
    let step = store.add_step(
        user_id,
        params.goal_id,
        &params.title,
        params.order,
        params.planned_date,
        params.planned_time,
    )?;
    Ok(ProcessResponse::final_text(format!("Добавил шаг «{}» (№{}).", step.title, step.order)))
}

/// Deletes the step and any linked Event atomically. Same
/// dry-run/confirm shape as `goal.delete`.
pub fn delete_step(store: &dyn Store, cache: &ResultSetCache, user_id: &UserId, params: &GoalDeleteStepParams) -> Result<ProcessResponse> {
    let step_id = resolve_target(cache, user_id, &params.target)?;
    if params.dry_run {
        let Some(step) = store.get_step(user_id, step_id)? else {
            return Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::ReferencesUnknownEntity));
        };
        let text = format!("Удалить шаг «{}»?", step.title);
        return Ok(ProcessResponse::ask_clarification_with_buttons(text, confirm_buttons("goal.delete_step", step_id)));
    }
    let deleted = store.delete_step_cascade(user_id, step_id)?;
    if deleted {
        Ok(ProcessResponse::final_text("Шаг удалён."))
    } else {
        Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::ReferencesUnknownEntity))
    }
}

fn confirm_buttons(op: &str, id: i64) -> Vec<Vec<Button>> {
    vec![vec![
        Button {
            text: "Да, удалить".to_string(),
            callback_data: format!("confirm:{op}:{id}"),
        },
        Button {
            text: "Отмена".to_string(),
            callback_data: "cancel".to_string(),
        },
    ]]
}

fn status_label(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "ожидает",
        StepStatus::InProgress => "в процессе",
        StepStatus::Completed => "выполнено",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::types::Priority;
    use waypoint_intent::intent::IdOrOrdinal;
    use waypoint_store::models::{NewGoal, NewStepDraft};
    use waypoint_store::SqliteStore;

    fn setup_goal(store: &SqliteStore, user_id: &UserId, n_steps: i64) -> (i64, Vec<i64>) {
        let steps = (1..=n_steps)
            .map(|i| NewStepDraft {
                title: format!("Шаг {i}"),
                order: i,
                estimated_hours: 2.0,
            })
            .collect();
        let (goal, steps) = store
            .create_goal_with_steps(
                user_id,
                NewGoal {
                    title: "Выучить испанский".into(),
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

    /// S3 — step completion cascades progress: 4 steps, complete 2, expect
    /// 50%/active; complete the rest, expect 100%/completed.
    #[test]
    fn completing_steps_cascades_goal_progress_and_status() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let cache = ResultSetCache::new(64, 3600);
        let (goal_id, step_ids) = setup_goal(&store, &user_id, 4);

        store.update_step_status(&user_id, step_ids[0], StepStatus::Completed).unwrap();

        let response = update_step(
            &store,
            &cache,
            &user_id,
            &GoalUpdateStepParams {
                target: IdOrOrdinal::Id(step_ids[1]),
                new_status: StepStatus::Completed,
                dry_run: false,
            },
        )
        .unwrap();
        assert!(response.success);
        let goal = store.get_goal(&user_id, goal_id).unwrap().unwrap();
        assert_eq!(goal.progress_percent, 50);
        assert_eq!(goal.status, waypoint_core::types::GoalStatus::Active);

        store.update_step_status(&user_id, step_ids[2], StepStatus::Completed).unwrap();
        store.update_step_status(&user_id, step_ids[3], StepStatus::Completed).unwrap();
        let goal = store.get_goal(&user_id, goal_id).unwrap().unwrap();
        assert_eq!(goal.progress_percent, 100);
        assert_eq!(goal.status, waypoint_core::types::GoalStatus::Completed);
    }

    /// Round-trip law: complete then un-complete restores progress.
    #[test]
    fn toggling_a_step_back_to_pending_restores_prior_progress() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u2");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let (goal_id, step_ids) = setup_goal(&store, &user_id, 4);
        store.update_step_status(&user_id, step_ids[0], StepStatus::Completed).unwrap();
        let before = store.get_goal(&user_id, goal_id).unwrap().unwrap().progress_percent;

        store.update_step_status(&user_id, step_ids[1], StepStatus::Completed).unwrap();
        store.update_step_status(&user_id, step_ids[1], StepStatus::Pending).unwrap();
        let after = store.get_goal(&user_id, goal_id).unwrap().unwrap().progress_percent;
        assert_eq!(before, after);
    }

    #[test]
    fn dry_run_delete_previews_without_mutating_and_offers_a_confirm_button() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u3");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let cache = ResultSetCache::new(64, 3600);
        let (goal_id, _) = setup_goal(&store, &user_id, 3);

        let response = delete(
            &store,
            &cache,
            &user_id,
            &GoalDeleteParams {
                target: IdOrOrdinal::Id(goal_id),
                dry_run: true,
            },
        )
        .unwrap();
        assert_eq!(response.response_type, waypoint_core::types::ResponseType::AskClarification);
        assert!(response.buttons.is_some());
        assert!(store.get_goal(&user_id, goal_id).unwrap().is_some(), "dry run must not delete");

        let response = delete(
            &store,
            &cache,
            &user_id,
            &GoalDeleteParams {
                target: IdOrOrdinal::Id(goal_id),
                dry_run: false,
            },
        )
        .unwrap();
        assert!(response.success);
        assert!(store.get_goal(&user_id, goal_id).unwrap().is_none());
    }

    #[test]
    fn add_step_without_order_defaults_to_max_plus_one() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u4");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        let cache = ResultSetCache::new(64, 3600);
        let (goal_id, _) = setup_goal(&store, &user_id, 3);

        let response = add_step(
            &store,
            &cache,
            &user_id,
            &GoalAddStepParams {
                goal_id,
                title: "Новый шаг".into(),
                order: None,
                planned_date: None,
                planned_time: None,
                dry_run: false,
            },
        )
        .unwrap();
        assert!(response.success);
        let steps = store.list_steps(&user_id, goal_id).unwrap();
        let orders: Vec<i64> = steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
    }
}
