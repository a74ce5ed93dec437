//! The summarization step of the pipeline: "if goal.create →
//! model summarizes". A second, narrow model call that turns a freshly
//! scheduled goal into one short confirmation sentence — deliberately the
//! only dispatch outcome routed through the model a second time, since
//! every other outcome already has a deterministic, template-shaped
//! response (render_table / ask_clarification / plain final_text).
//!
//! Grounded on the same single-shot `ModelAdapter::complete` contract the
//! intent parser and decomposer use, with the same "never fail the turn
//! over a phrasing call" posture as `waypoint-planner::decompose` — on
//! timeout or transport error we fall back to a deterministic sentence
//! built from the scheduling result instead of surfacing an error.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use waypoint_core::model::ModelAdapter;
use waypoint_planner::ScheduledGoal;

pub struct Summarizer {
    model: Arc<dyn ModelAdapter>,
    temperature: f32,
    timeout: Duration,
}

impl Summarizer {
    pub fn new(model: Arc<dyn ModelAdapter>, temperature: f32, timeout_ms: u64) -> Self {
        Self {
            model,
            temperature,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub async fn summarize_goal_created(&self, title: &str, scheduled: &ScheduledGoal) -> String {
        let prompt = render_goal_created_prompt(title, scheduled);
        match self.model.complete(&prompt, self.temperature, self.timeout).await {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    fallback_goal_created_text(title, scheduled)
                } else {
                    trimmed.to_string()
                }
            }
            Err(err) => {
                warn!(error = %err, "summarizer model call failed, using deterministic fallback");
                fallback_goal_created_text(title, scheduled)
            }
        }
    }
}

fn render_goal_created_prompt(title: &str, scheduled: &ScheduledGoal) -> String {
    format!(
        "Цель \"{title}\" сохранена и разбита на {steps} шагов. {tight}\n\n\
         Напиши одно короткое дружелюбное подтверждение пользователю на русском \
         языке (1-2 предложения, без лишних деталей).",
        title = title,
        steps = scheduled.step_count,
        tight = if scheduled.tight_deadline {
            "Срок сжатый — не все шаги удалось равномерно расставить по календарю."
        } else {
            "Шаги расставлены по календарю."
        },
    )
}

fn fallback_goal_created_text(title: &str, scheduled: &ScheduledGoal) -> String {
    if scheduled.tight_deadline {
        format!(
            "Цель «{title}» сохранена, разбита на {steps} шагов. Срок сжатый — часть шагов \
             пришлось поставить плотнее, чем обычно.",
            title = title,
            steps = scheduled.step_count,
        )
    } else {
        format!(
            "Цель «{title}» сохранена и разбита на {steps} шагов, все расставлены по календарю.",
            title = title,
            steps = scheduled.step_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use waypoint_core::model::ModelAdapterError;

    struct FailingModel;

    #[async_trait]
    impl ModelAdapter for FailingModel {
        async fn complete(
            &self,
            _prompt: &str,
            _temperature: f32,
            _timeout: Duration,
        ) -> Result<String, ModelAdapterError> {
            Err(ModelAdapterError::Transport("boom".into()))
        }
    }

    struct EchoModel(&'static str);

    #[async_trait]
    impl ModelAdapter for EchoModel {
        async fn complete(
            &self,
            _prompt: &str,
            _temperature: f32,
            _timeout: Duration,
        ) -> Result<String, ModelAdapterError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn falls_back_to_deterministic_text_on_model_failure() {
        let summarizer = Summarizer::new(Arc::new(FailingModel), 0.3, 2000);
        let scheduled = ScheduledGoal {
            goal_id: 1,
            step_count: 5,
            tight_deadline: true,
        };
        let text = summarizer.summarize_goal_created("Выучить испанский", &scheduled).await;
        assert!(text.contains("Выучить испанский"));
        assert!(text.contains("5"));
        assert!(text.contains("сжатый"));
    }

    #[tokio::test]
    async fn uses_model_text_when_available() {
        let summarizer = Summarizer::new(Arc::new(EchoModel("Готово, цель поставлена!")), 0.3, 2000);
        let scheduled = ScheduledGoal {
            goal_id: 1,
            step_count: 4,
            tight_deadline: false,
        };
        let text = summarizer.summarize_goal_created("Пробежать марафон", &scheduled).await;
        assert_eq!(text, "Готово, цель поставлена!");
    }
}
