//! The top-level pipeline (context assembler, intent parser, dialog engine,
//! handlers and planner wired together):
//! assemble context → parse intent → let the Dialog State Machine intercept
//! multi-turn sub-flows → dispatch to a handler → best-effort persist the
//! turn. An assemble → run → persist shape, generalized from a generic
//! agent tool loop to this workspace's dialog-interception-then-dispatch
//! shape.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::warn;
use waypoint_core::config::WaypointConfig;
use waypoint_core::model::ModelAdapter;
use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};
use waypoint_core::time::parse_timezone;
use waypoint_core::types::{Priority, UserId, UserLevel};
use waypoint_context::ContextAssembler;
use waypoint_dialog::{
    parse_callback, Callback, DialogEngine, DialogOutcome, GoalDraftContext,
};
use waypoint_intent::{Intent, IntentParser};
use waypoint_planner::{Decomposer, GoalDraftInput, GoalPlanner};
use waypoint_resultcache::ResultSetCache;
use waypoint_store::models::{EventPatch, GoalPatch, StepFieldPatch};
use waypoint_store::Store;

use crate::error::Result;
use crate::handlers;
use crate::locks::UserLocks;
use crate::response::{day_pref_buttons, time_pref_buttons, ProcessResponse};
use crate::summarizer::Summarizer;

pub struct Orchestrator {
    store: Arc<dyn Store>,
    context: ContextAssembler,
    intent_parser: IntentParser,
    dialog: DialogEngine,
    cache: ResultSetCache,
    planner: GoalPlanner,
    summarizer: Summarizer,
    locks: UserLocks,
    default_timezone: String,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        model: Arc<dyn ModelAdapter>,
        cache: ResultSetCache,
        config: &WaypointConfig,
    ) -> Self {
        let decomposer = Decomposer::new(
            Arc::clone(&model),
            config.model.temperature,
            config.model.timeout_ms,
        );
        Self {
            context: ContextAssembler::new(Arc::clone(&store)),
            intent_parser: IntentParser::new(
                Arc::clone(&model),
                config.model.temperature,
                config.model.timeout_ms,
            ),
            dialog: DialogEngine::new(Arc::clone(&store)),
            planner: GoalPlanner::new(Arc::clone(&store), decomposer),
            summarizer: Summarizer::new(model, config.model.temperature, config.model.timeout_ms),
            locks: UserLocks::new(),
            default_timezone: config.default_timezone.clone(),
            cache,
            store,
        }
    }

    /// `POST /process`. `chat_id` has no distinct field in
    /// the inbound request — the gateway contract only carries `user_id`,
    /// so the user's own id doubles as `chat_id` the first time a profile is
    /// created; nothing downstream distinguishes the two.
    pub async fn process_message(&self, user_id: &UserId, message: &str) -> Result<ProcessResponse> {
        let store = Arc::clone(&self.store);
        let owned_user_id = user_id.clone();
        let lock_key = owned_user_id.clone();
        self.locks
            .with_user_lock(&lock_key, move || async move {
                let user_id = owned_user_id;
                store.get_or_create_profile(&user_id, user_id.as_str(), &self.default_timezone)?;
                let response = self.route_message(&user_id, message).await?;
                let _ = store.append_message(&user_id, "user", message, None);
                let _ = store.append_message(&user_id, "assistant", &response.text, None);
                Ok(response)
            })
            .await
    }

    /// `POST /callback`.
    pub async fn process_callback(&self, user_id: &UserId, callback_data: &str) -> Result<ProcessResponse> {
        let store = Arc::clone(&self.store);
        let owned_user_id = user_id.clone();
        let lock_key = owned_user_id.clone();
        self.locks
            .with_user_lock(&lock_key, move || async move {
                let user_id = owned_user_id;
                store.get_or_create_profile(&user_id, user_id.as_str(), &self.default_timezone)?;
                let response = self.route_callback(&user_id, callback_data).await?;
                let _ = store.append_message(&user_id, "assistant", &response.text, None);
                Ok(response)
            })
            .await
    }

    async fn route_message(&self, user_id: &UserId, message: &str) -> Result<ProcessResponse> {
        let (state, _ctx) = self.dialog.load_effective_state(user_id)?;
        let intercepted = match state {
            waypoint_dialog::DialogState::GoalClarification => {
                Some(self.dialog.continue_goal_clarification(user_id, message)?)
            }
            waypoint_dialog::DialogState::GoalEdit(_)
            | waypoint_dialog::DialogState::EventEdit(_)
            | waypoint_dialog::DialogState::StepEdit(_) => {
                Some(self.dialog.apply_edit_reply(user_id, message)?)
            }
            // Schedule preferences are driven by callback buttons only; a
            // free-text message here falls through to fresh-intent handling
            // so the user isn't stuck if they type instead of tapping.
            waypoint_dialog::DialogState::SchedulePrefsDays
            | waypoint_dialog::DialogState::SchedulePrefsTime
            | waypoint_dialog::DialogState::Idle => None,
        };

        if let Some(outcome) = intercepted {
            return self.respond_to_dialog_outcome(user_id, outcome).await;
        }

        self.handle_fresh_intent(user_id, message).await
    }

    async fn route_callback(&self, user_id: &UserId, callback_data: &str) -> Result<ProcessResponse> {
        let Some(callback) = parse_callback(callback_data) else {
            return Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::IntentInvalid));
        };
        let outcome = self.dialog.handle_callback(user_id, &callback)?;
        match outcome {
            DialogOutcome::NotHandled => {
                if let Callback::Confirm { op, id } = callback {
                    self.confirm_op(user_id, &op, id)
                } else {
                    Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::IntentInvalid))
                }
            }
            other => self.respond_to_dialog_outcome(user_id, other).await,
        }
    }

    /// Replays the one mutation a `confirm:<op>:<id>` token can carry — the
    /// id alone is enough for `goal.delete`/`goal.delete_step`, the two
    /// variants whose dry-run preview offered this button.
    fn confirm_op(&self, user_id: &UserId, op: &str, id: i64) -> Result<ProcessResponse> {
        match op {
            "goal.delete" => {
                let deleted = self.store.delete_goal_cascade(user_id, id)?;
                Ok(if deleted {
                    ProcessResponse::final_text("Цель удалена.")
                } else {
                    ProcessResponse::from_taxonomy(ErrorTaxonomy::ReferencesUnknownEntity)
                })
            }
            "goal.delete_step" => {
                let deleted = self.store.delete_step_cascade(user_id, id)?;
                Ok(if deleted {
                    ProcessResponse::final_text("Шаг удалён.")
                } else {
                    ProcessResponse::from_taxonomy(ErrorTaxonomy::ReferencesUnknownEntity)
                })
            }
            _ => Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::IntentInvalid)),
        }
    }

    async fn handle_fresh_intent(&self, user_id: &UserId, message: &str) -> Result<ProcessResponse> {
        let (state, ctx) = self.dialog.load_effective_state(user_id)?;
        let state_context = if state.is_idle() {
            None
        } else {
            Some(ctx.to_string())
        };
        let bundle = self.context.assemble(user_id, state_context)?;

        let intent = match self.intent_parser.parse(&bundle, message).await {
            Ok(intent) => intent,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "intent parse failed for this turn");
                return Ok(ProcessResponse::from_taxonomy(err.taxonomy()));
            }
        };

        if let Intent::GoalCreate(params) = &intent {
            return self.start_goal_creation(user_id, params).await;
        }

        self.dispatch_intent(user_id, &intent)
    }

    async fn start_goal_creation(
        &self,
        user_id: &UserId,
        params: &waypoint_intent::intent::GoalCreateParams,
    ) -> Result<ProcessResponse> {
        if params.dry_run {
            return Ok(ProcessResponse::ask_clarification(format!(
                "Создать цель «{}»?",
                params.title
            )));
        }
        let draft = GoalDraftContext {
            title: params.title.clone(),
            description: params.description.clone(),
            target_date: params.target_date,
            category: params.category.clone(),
            priority: params.priority,
            user_level: params.user_level,
            time_commitment: params.time_commitment,
            preferred_days: Vec::new(),
            preferred_time: None,
        };
        let outcome = self.dialog.start_goal_creation(user_id, draft)?;
        self.respond_to_dialog_outcome(user_id, outcome).await
    }

    fn dispatch_intent(&self, user_id: &UserId, intent: &Intent) -> Result<ProcessResponse> {
        match intent {
            Intent::SmallTalk(p) => Ok(ProcessResponse::final_text(small_talk_reply(&p.reply_hint))),
            Intent::EventSearch(p) => handlers::event::search(self.store.as_ref(), &self.cache, user_id, p),
            Intent::EventMutate(p) => handlers::event::mutate(self.store.as_ref(), &self.cache, user_id, p),
            Intent::GoalSearch(p) => handlers::goal::search(self.store.as_ref(), &self.cache, user_id, p),
            Intent::GoalCreate(_) => unreachable!("goal.create is intercepted before dispatch"),
            Intent::GoalDelete(p) => handlers::goal::delete(self.store.as_ref(), &self.cache, user_id, p),
            Intent::GoalQuery(p) => handlers::goal::query(self.store.as_ref(), &self.cache, user_id, p),
            Intent::GoalUpdateStep(p) => {
                handlers::goal::update_step(self.store.as_ref(), &self.cache, user_id, p)
            }
            Intent::GoalAddStep(p) => handlers::goal::add_step(self.store.as_ref(), &self.cache, user_id, p),
            Intent::GoalDeleteStep(p) => {
                handlers::goal::delete_step(self.store.as_ref(), &self.cache, user_id, p)
            }
            Intent::ProductSearch(p) => handlers::product::search(p),
        }
    }

    async fn respond_to_dialog_outcome(&self, user_id: &UserId, outcome: DialogOutcome) -> Result<ProcessResponse> {
        match outcome {
            DialogOutcome::NotHandled => Ok(ProcessResponse::ask_clarification(
                "Не понял, уточните, пожалуйста.",
            )),
            DialogOutcome::Cancelled => Ok(ProcessResponse::final_text("Хорошо, отменил.")),
            DialogOutcome::EnteredClarification { follow_up }
            | DialogOutcome::ClarificationStillFailing { follow_up } => {
                Ok(ProcessResponse::ask_clarification(follow_up))
            }
            DialogOutcome::EnteredSchedulePrefsDays => Ok(ProcessResponse::ask_clarification_with_buttons(
                "В какие дни недели удобно заниматься?",
                day_pref_buttons(&[]),
            )),
            DialogOutcome::DayPrefToggled { days } => Ok(ProcessResponse::ask_clarification_with_buttons(
                "Отметьте дни и нажмите «Готово».",
                day_pref_buttons(&days),
            )),
            DialogOutcome::EnteredSchedulePrefsTime => Ok(ProcessResponse::ask_clarification_with_buttons(
                "В какое время дня?",
                time_pref_buttons(),
            )),
            DialogOutcome::ReadyForDecomposition(draft) => self.finish_goal_creation(user_id, draft).await,
            DialogOutcome::EnteredEditState(state) => Ok(ProcessResponse::ask_clarification(format!(
                "Введите новое значение ({state}).",
            ))),
            DialogOutcome::FieldEdited { entity, id, field, new_value } => {
                self.apply_field_edit(user_id, &entity, id, &field, &new_value)
            }
        }
    }

    async fn finish_goal_creation(&self, user_id: &UserId, draft: GoalDraftContext) -> Result<ProcessResponse> {
        let timezone_name = self
            .store
            .get_profile(user_id)?
            .map(|p| p.timezone)
            .unwrap_or_else(|| self.default_timezone.clone());
        let tz = parse_timezone(&timezone_name).unwrap_or(chrono_tz::Europe::Moscow);
        let today = waypoint_core::time::today_in_tz(tz);
        let preferred_time = draft
            .preferred_time
            .as_deref()
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok());

        let draft_input = GoalDraftInput {
            title: draft.title.clone(),
            description: draft.description,
            target_date: draft.target_date,
            category: draft.category,
            priority: draft.priority.unwrap_or(Priority::Medium),
            user_level: draft.user_level.unwrap_or(UserLevel::Beginner),
            time_commitment: draft.time_commitment,
            preferred_weekdays: draft.preferred_days,
            preferred_time,
        };

        let scheduled = self
            .planner
            .create_and_schedule(user_id, draft_input, today, tz)
            .await?;
        let text = self.summarizer.summarize_goal_created(&draft.title, &scheduled).await;
        Ok(ProcessResponse::final_text(text))
    }

    fn apply_field_edit(
        &self,
        user_id: &UserId,
        entity: &str,
        id: i64,
        field: &str,
        new_value: &str,
    ) -> Result<ProcessResponse> {
        match entity {
            "goal" => self.apply_goal_field_edit(user_id, id, field, new_value),
            "event" => self.apply_event_field_edit(user_id, id, field, new_value),
            "step" => self.apply_step_field_edit(user_id, id, field, new_value),
            _ => Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::IntentInvalid)),
        }
    }

    fn apply_goal_field_edit(&self, user_id: &UserId, id: i64, field: &str, new_value: &str) -> Result<ProcessResponse> {
        let patch = match field {
            "title" => GoalPatch {
                title: Some(new_value.to_string()),
                ..Default::default()
            },
            "description" => GoalPatch {
                description: Some(Some(new_value.to_string())),
                ..Default::default()
            },
            "category" => GoalPatch {
                category: Some(Some(new_value.to_string())),
                ..Default::default()
            },
            "deadline" => {
                let Some(date) = parse_date(new_value) else {
                    return Ok(ProcessResponse::ask_clarification(
                        "Не понял дату, укажите в формате ГГГГ-ММ-ДД.",
                    ));
                };
                GoalPatch {
                    target_date: Some(Some(date)),
                    ..Default::default()
                }
            }
            "priority" => {
                let Ok(priority) = new_value.trim().parse::<Priority>() else {
                    return Ok(ProcessResponse::ask_clarification(
                        "Укажите приоритет: low, medium или high.",
                    ));
                };
                GoalPatch {
                    priority: Some(priority),
                    ..Default::default()
                }
            }
            _ => return Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::IntentInvalid)),
        };
        match self.store.update_goal(user_id, id, patch) {
            Ok(goal) => Ok(ProcessResponse::final_text(format!("Цель «{}» обновлена.", goal.title))),
            Err(e) => Ok(ProcessResponse::from_taxonomy(e.taxonomy())),
        }
    }

    fn apply_event_field_edit(&self, user_id: &UserId, id: i64, field: &str, new_value: &str) -> Result<ProcessResponse> {
        let patch = match field {
            "title" => EventPatch {
                title: Some(new_value.to_string()),
                ..Default::default()
            },
            "notes" => EventPatch {
                notes: Some(Some(new_value.to_string())),
                ..Default::default()
            },
            "date" => {
                let Some(date) = parse_date(new_value) else {
                    return Ok(ProcessResponse::ask_clarification(
                        "Не понял дату, укажите в формате ГГГГ-ММ-ДД.",
                    ));
                };
                EventPatch {
                    date: Some(date),
                    ..Default::default()
                }
            }
            "time" => {
                let Some(time) = parse_time(new_value) else {
                    return Ok(ProcessResponse::ask_clarification(
                        "Не понял время, укажите в формате ЧЧ:ММ.",
                    ));
                };
                EventPatch {
                    time: Some(Some(time)),
                    ..Default::default()
                }
            }
            "duration" => {
                let Ok(minutes) = new_value.trim().parse::<i64>() else {
                    return Ok(ProcessResponse::ask_clarification(
                        "Укажите длительность в минутах, числом.",
                    ));
                };
                EventPatch {
                    duration_minutes: Some(minutes),
                    ..Default::default()
                }
            }
            _ => return Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::IntentInvalid)),
        };
        match self.store.update_event(user_id, id, patch) {
            Ok(event) => Ok(ProcessResponse::final_text(format!("Событие «{}» обновлено.", event.title))),
            Err(e) => Ok(ProcessResponse::from_taxonomy(e.taxonomy())),
        }
    }

    fn apply_step_field_edit(&self, user_id: &UserId, id: i64, field: &str, new_value: &str) -> Result<ProcessResponse> {
        let patch = match field {
            "title" => StepFieldPatch {
                title: Some(new_value.to_string()),
                ..Default::default()
            },
            "date" => {
                let Some(date) = parse_date(new_value) else {
                    return Ok(ProcessResponse::ask_clarification(
                        "Не понял дату, укажите в формате ГГГГ-ММ-ДД.",
                    ));
                };
                StepFieldPatch {
                    planned_date: Some(Some(date)),
                    ..Default::default()
                }
            }
            "time" => {
                let Some(time) = parse_time(new_value) else {
                    return Ok(ProcessResponse::ask_clarification(
                        "Не понял время, укажите в формате ЧЧ:ММ.",
                    ));
                };
                StepFieldPatch {
                    planned_time: Some(Some(time)),
                    ..Default::default()
                }
            }
            _ => return Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::IntentInvalid)),
        };
        match self.store.update_step_fields(user_id, id, patch) {
            Ok(step) => Ok(ProcessResponse::final_text(format!("Шаг «{}» обновлён.", step.title))),
            Err(e) => Ok(ProcessResponse::from_taxonomy(e.taxonomy())),
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M").ok().or_else(|| NaiveTime::parse_from_str(s, "%H:%M:%S").ok())
}

/// `small_talk` carries a `reply_hint` label rather than literal text;
/// this is the one place that label becomes user-facing Russian.
fn small_talk_reply(hint: &str) -> &'static str {
    match hint {
        "greeting" => "Привет! Чем могу помочь?",
        "thanks" => "Пожалуйста!",
        "farewell" => "До встречи!",
        _ => "Я здесь, чтобы помочь с целями и расписанием.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use waypoint_core::model::ModelAdapterError;
    use waypoint_store::SqliteStore;
    use std::time::Duration;

    struct ScriptedModel(std::sync::Mutex<Vec<String>>);

    impl ScriptedModel {
        fn new(replies: Vec<&str>) -> Self {
            Self(std::sync::Mutex::new(replies.into_iter().map(String::from).rev().collect()))
        }
    }

    #[async_trait]
    impl ModelAdapter for ScriptedModel {
        async fn complete(&self, _prompt: &str, _temperature: f32, _timeout: Duration) -> std::result::Result<String, ModelAdapterError> {
            Ok(self.0.lock().unwrap().pop().unwrap_or_default())
        }
    }

    fn orchestrator(model: Arc<dyn ModelAdapter>) -> Orchestrator {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let cache = ResultSetCache::new(64, 3600);
        let config = WaypointConfig::default();
        Orchestrator::new(store, model, cache, &config)
    }

    #[tokio::test]
    async fn small_talk_round_trips_to_a_final_text_response() {
        let model = Arc::new(ScriptedModel::new(vec![r#"{"small_talk":{"reply_hint":"greeting"}}"#]));
        let orch = orchestrator(model);
        let user_id = UserId::from("u1");
        let response = orch.process_message(&user_id, "привет").await.unwrap();
        assert!(response.success);
        assert_eq!(response.text, "Привет! Чем могу помочь?");
    }

    #[tokio::test]
    async fn vague_goal_enters_clarification_then_schedule_prefs() {
        let model = Arc::new(ScriptedModel::new(vec![
            r#"{"goal.create":{"title":"спорт"}}"#,
        ]));
        let orch = orchestrator(model);
        let user_id = UserId::from("u2");
        let response = orch
            .process_message(&user_id, "хочу заняться спортом")
            .await
            .unwrap();
        assert_eq!(response.response_type, waypoint_core::types::ResponseType::AskClarification);
    }

    #[tokio::test]
    async fn unknown_callback_token_is_reported_as_invalid() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let orch = orchestrator(model);
        let user_id = UserId::from("u3");
        let response = orch.process_callback(&user_id, "nonsense").await.unwrap();
        assert!(!response.success);
    }

    #[tokio::test]
    async fn confirm_goal_delete_on_missing_goal_reports_unknown_entity() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let orch = orchestrator(model);
        let user_id = UserId::from("u4");
        let response = orch.process_callback(&user_id, "confirm:goal.delete:999").await.unwrap();
        assert!(!response.success);
    }
}
