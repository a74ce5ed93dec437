//! The template registry: `(template_id, named-
//! parameter bag) -> String`. Each template is one constant id plus one
//! render function over a typed parameter struct — a plain Rust function
//! table, not a general templating engine, so a missing or renamed field
//! is a compile error.

use crate::bundle::PromptBundle;

pub const TEMPLATE_INTENT_PARSE: &str = "intent_parse_v1";
pub const TEMPLATE_INTENT_PARSE_STRICT: &str = "intent_parse_strict_v1";
pub const TEMPLATE_DECOMPOSE: &str = "goal_decompose_v1";
pub const TEMPLATE_DECOMPOSE_STRICT: &str = "goal_decompose_strict_v1";

/// Parameters recognized by [`TEMPLATE_INTENT_PARSE`]. Fixed and documented
/// here — the registry's single source of truth for this template's shape.
pub struct IntentParseParams<'a> {
    pub bundle: &'a PromptBundle,
    pub utterance: &'a str,
}

/// Render the bundle plus the current utterance into the literal prompt
/// string handed to the model adapter for intent parsing.
pub fn render_intent_parse(params: IntentParseParams<'_>) -> String {
    let IntentParseParams { bundle, utterance } = params;
    let goals = if bundle.active_goals.is_empty() {
        "(нет активных целей)".to_string()
    } else {
        bundle
            .active_goals
            .iter()
            .map(|g| {
                let target = g
                    .target_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "без срока".to_string());
                format!("- {} ({}%, до {})", g.title, g.progress_percent, target)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let events = if bundle.upcoming_events.is_empty() {
        "(нет ближайших событий)".to_string()
    } else {
        bundle
            .upcoming_events
            .iter()
            .map(|e| format!("- {} — {}", e.when_local, e.title))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let history = bundle
        .conversation_history
        .iter()
        .map(|t| format!("{}: {}", t.role, t.text))
        .collect::<Vec<_>>()
        .join("\n");
    let state = bundle
        .state_context
        .as_deref()
        .unwrap_or("(нет активного сценария)");

    format!(
        "Пользователь: {user_name}\nЧасовой пояс: {tz}\nТекущее время: {now}\n\n\
         Активные цели:\n{goals}\n\nБлижайшие события:\n{events}\n\n\
         История диалога:\n{history}\n\nТекущий сценарий: {state}\n\n\
         Сообщение пользователя: {utterance}\n\n\
         Ответь строго одним JSON-объектом с единственным ключом варианта намерения.",
        user_name = bundle.user_name,
        tz = bundle.timezone,
        now = bundle.now,
        goals = goals,
        events = events,
        history = history,
        state = state,
        utterance = utterance,
    )
}

/// The retry prompt used on a first JSON parse failure (§4.2 step 3): the
/// same bundle, plus a terse "reply JSON only" reminder appended.
pub fn render_intent_parse_strict(params: IntentParseParams<'_>) -> String {
    format!(
        "{}\n\nВАЖНО: ответь строго валидным JSON без какого-либо текста вне объекта.",
        render_intent_parse(params)
    )
}

/// Parameters recognized by [`TEMPLATE_DECOMPOSE`] — the Goal Decomposer's
/// Phase 1 inputs (§4.5), deliberately narrower than [`IntentParseParams`]:
/// decomposition never needs the full prompt bundle, only the draft itself.
pub struct DecomposeParams<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub target_date: Option<chrono::NaiveDate>,
    pub user_level: &'a str,
    pub time_commitment_minutes_per_week: Option<u32>,
}

pub fn render_decompose(params: DecomposeParams<'_>) -> String {
    let description = params.description.unwrap_or("(без описания)");
    let target = params
        .target_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "не указан".to_string());
    let commitment = params
        .time_commitment_minutes_per_week
        .map(|m| format!("{m} минут в неделю"))
        .unwrap_or_else(|| "не указано".to_string());

    format!(
        "Цель: {title}\nОписание: {description}\nСрок: {target}\nУровень пользователя: {level}\n\
         Располагаемое время: {commitment}\n\n\
         Разбей эту цель на от 3 до 12 последовательных шагов. Ответь строго одним JSON-объектом \
         вида {{\"steps\": [{{\"title\": str, \"estimated_hours\": number, \"order\": int}}, ...]}} \
         с уникальными порядковыми номерами, начиная с 1.",
        title = params.title,
        description = description,
        target = target,
        level = params.user_level,
        commitment = commitment,
    )
}

pub fn render_decompose_strict(params: DecomposeParams<'_>) -> String {
    format!(
        "{}\n\nВАЖНО: ответь строго валидным JSON без какого-либо текста вне объекта.",
        render_decompose(params)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::PromptBundle;

    #[test]
    fn render_intent_parse_includes_utterance() {
        let bundle = PromptBundle {
            user_name: "Аня".into(),
            timezone: "Europe/Moscow".into(),
            now: "2026-07-27 12:00".into(),
            active_goals: vec![],
            upcoming_events: vec![],
            conversation_history: vec![],
            state_context: None,
        };
        let rendered = render_intent_parse(IntentParseParams {
            bundle: &bundle,
            utterance: "покажи мои цели",
        });
        assert!(rendered.contains("покажи мои цели"));
        assert!(rendered.contains("Аня"));
    }

    #[test]
    fn render_decompose_includes_title_and_level() {
        let rendered = render_decompose(DecomposeParams {
            title: "Выучить испанский",
            description: None,
            target_date: None,
            user_level: "beginner",
            time_commitment_minutes_per_week: Some(300),
        });
        assert!(rendered.contains("Выучить испанский"));
        assert!(rendered.contains("beginner"));
        assert!(rendered.contains("300 минут"));
    }
}
