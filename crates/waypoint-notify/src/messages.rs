//! Message bodies for the four notification jobs.
//! Plain string building, no templating engine — these are short
//! and the job functions are already the single place that needs them.

use chrono::NaiveDate;
use rand::seq::IndexedRandom;
use waypoint_store::models::{Event, Goal, Step};

const MOTIVATORS: &[&str] = &[
    "Маленький шаг сегодня — большой результат завтра.",
    "Вы уже продвинулись дальше, чем вчера. Продолжайте.",
    "Дисциплина — это мост между целью и её достижением.",
    "Даже медленный прогресс — это прогресс.",
    "Не останавливайтесь, когда устали — остановитесь, когда закончили.",
];

pub fn event_reminder_text(event: &Event, minutes_remaining: i64) -> String {
    let when = match event.time {
        Some(t) => format!("{} {}", event.date.format("%Y-%m-%d"), t.format("%H:%M")),
        None => event.date.format("%Y-%m-%d").to_string(),
    };
    format!(
        "Напоминание: «{title}» — {when} (через {minutes} мин.)",
        title = event.title,
        when = when,
        minutes = minutes_remaining,
    )
}

pub fn goal_deadline_text(goal: &Goal, days_left: i64) -> String {
    let days_label = match days_left {
        0 => "сегодня последний день".to_string(),
        1 => "остался 1 день".to_string(),
        n => format!("осталось {n} дн."),
    };
    format!(
        "Цель «{title}»: выполнено {progress}%, {days_label}.",
        title = goal.title,
        progress = goal.progress_percent,
        days_label = days_label,
    )
}

pub fn step_reminder_text(goal_title: &str, overdue_steps: &[&Step], today: NaiveDate) -> String {
    let lines: Vec<String> = overdue_steps
        .iter()
        .map(|s| {
            let planned = s
                .planned_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "без даты".to_string());
            let overdue_days = s
                .planned_date
                .map(|d| (today - d).num_days())
                .unwrap_or(0);
            format!("- {} (план: {}, просрочено на {} дн.)", s.title, planned, overdue_days)
        })
        .collect();
    format!(
        "Просроченные шаги по цели «{goal_title}»:\n{}",
        lines.join("\n")
    )
}

pub fn motivation_text(active_goals: &[Goal]) -> String {
    let motivator = MOTIVATORS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(MOTIVATORS[0]);
    let summary = active_goals
        .iter()
        .map(|g| format!("- {} ({}%)", g.title, g.progress_percent))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{motivator}\n\nВаши активные цели:\n{summary}")
}
