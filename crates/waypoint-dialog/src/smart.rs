//! SMART validation for `goal.create`. A goal draft
//! passes when its title reads as an action rather than a vague wish and
//! either carries a deadline or a duration mentioned in its description —
//! a cheap heuristic, not a real NLP classifier.

const STOPWORDS: &[&str] = &[
    "и", "в", "на", "с", "по", "для", "что", "как", "это", "мне", "я", "бы", "уже", "очень", "а",
    "но", "же", "то", "бы", "из", "от", "до", "не",
];

const DURATION_MARKERS: &[&str] = &[
    "недел", "месяц", "день", "дня", "дней", "год", "лет", "часов", "час", "дедлайн", "срок",
];

pub struct GoalDraft {
    pub title: String,
    pub description: Option<String>,
    pub has_target_date: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartFailure {
    pub reason: &'static str,
    pub follow_up: &'static str,
}

/// `Ok(())` when the draft passes SMART validation; otherwise a targeted
/// follow-up question for `GOAL_CLARIFICATION` (§4.4).
pub fn validate_smart(draft: &GoalDraft) -> Result<(), SmartFailure> {
    if draft.title.trim().chars().count() < 8 || !has_verb_like_token(&draft.title) {
        return Err(SmartFailure {
            reason: "title_too_vague",
            follow_up: "Сформулируйте цель подробнее — что именно вы хотите сделать?",
        });
    }

    let duration_in_description = draft
        .description
        .as_deref()
        .map(mentions_duration)
        .unwrap_or(false);
    if !draft.has_target_date && !duration_in_description {
        return Err(SmartFailure {
            reason: "no_deadline_or_duration",
            follow_up: "К какому сроку вы хотите этого достичь?",
        });
    }

    if is_pure_question(&draft.title) || draft.description.as_deref().is_some_and(is_pure_question)
    {
        return Err(SmartFailure {
            reason: "pure_question",
            follow_up: "Это похоже на вопрос, а не на цель. Сформулируйте как задачу.",
        });
    }

    Ok(())
}

fn has_verb_like_token(title: &str) -> bool {
    title
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| t.chars().count() >= 4 && !STOPWORDS.contains(&t.as_str()))
        .count()
        > 0
}

fn mentions_duration(text: &str) -> bool {
    let lower = text.to_lowercase();
    DURATION_MARKERS.iter().any(|m| lower.contains(m))
}

fn is_pure_question(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.ends_with('?') && !trimmed.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_title() {
        let draft = GoalDraft {
            title: "спорт".to_string(),
            description: None,
            has_target_date: true,
        };
        assert!(validate_smart(&draft).is_err());
    }

    #[test]
    fn rejects_missing_deadline_and_duration() {
        let draft = GoalDraft {
            title: "Выучить испанский язык".to_string(),
            description: None,
            has_target_date: false,
        };
        assert!(validate_smart(&draft).is_err());
    }

    #[test]
    fn accepts_target_date_without_duration_in_description() {
        let draft = GoalDraft {
            title: "Выучить испанский язык".to_string(),
            description: Some("Хочу свободно говорить".to_string()),
            has_target_date: true,
        };
        assert!(validate_smart(&draft).is_ok());
    }

    #[test]
    fn accepts_duration_phrase_without_target_date() {
        let draft = GoalDraft {
            title: "Пробежать марафон полностью".to_string(),
            description: Some("За три месяца подготовиться".to_string()),
            has_target_date: false,
        };
        assert!(validate_smart(&draft).is_ok());
    }

    #[test]
    fn rejects_pure_question() {
        let draft = GoalDraft {
            title: "Почему я не худею?".to_string(),
            description: None,
            has_target_date: true,
        };
        assert!(validate_smart(&draft).is_err());
    }
}
