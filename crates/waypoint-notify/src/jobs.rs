//! The four notification jobs. Each is a scan over
//! `list_user_ids()` filtered by that user's own toggles and local time;
//! firing decisions claim a dedup row before a [`PendingNotification`] is
//! queued so a later deferred send is never re-decided.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use chrono_tz::Tz;
use tracing::error;
use waypoint_core::time::{local_to_utc, parse_timezone};
use waypoint_core::types::{GoalStatus, NotificationJobKind, StepStatus, UserId};
use waypoint_store::Store;

use crate::messages::{event_reminder_text, goal_deadline_text, motivation_text, step_reminder_text};

pub struct PendingNotification {
    pub user_id: UserId,
    pub chat_id: String,
    pub text: String,
}

/// Event reminder (every 60s tick): fires when `reminder_enabled` and
/// `event_datetime - reminder_minutes_before` falls in `[now, now+60s)`.
pub fn collect_event_reminders(store: &dyn Store, now_utc: DateTime<Utc>) -> Vec<PendingNotification> {
    let mut out = Vec::new();
    let user_ids = match store.list_user_ids() {
        Ok(ids) => ids,
        Err(e) => {
            error!("event reminder job: failed to list users: {e}");
            return out;
        }
    };
    for user_id in user_ids {
        let profile = match store.get_profile(&user_id) {
            Ok(Some(p)) => p,
            Ok(None) => continue,
            Err(e) => {
                error!(%user_id, "event reminder job: {e}");
                continue;
            }
        };
        if !profile.notify_enabled || !profile.notify_event_reminders {
            continue;
        }
        let tz: Tz = parse_timezone(&profile.timezone).unwrap_or(chrono_tz::Europe::Moscow);
        let window_end = now_utc + ChronoDuration::seconds(60);
        // The store's own query is a coarse calendar-day prefilter (it has
        // no timezone context); the exact
        // `event_datetime - reminder_minutes_before ∈ [now, now+60s)` check
        // happens here, in the user's own zone.
        let due = match store.list_due_event_reminders(&user_id, now_utc, window_end) {
            Ok(events) => events,
            Err(e) => {
                error!(%user_id, "event reminder job: {e}");
                continue;
            }
        };
        for event in due {
            if !event.reminder_enabled {
                continue;
            }
            let Some(event_time) = event.time else { continue };
            let Some(event_instant) = local_to_utc(tz, event.date, event_time) else {
                continue;
            };
            let fire_at = event_instant - ChronoDuration::minutes(event.reminder_minutes_before);
            if fire_at < now_utc || fire_at >= window_end {
                continue;
            }
            let key = format!("event:{}", event.event_id);
            match store.try_claim_dedup(&user_id, NotificationJobKind::EventReminder, &key, now_utc.date_naive()) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    error!(%user_id, "event reminder job dedup: {e}");
                    continue;
                }
            }
            out.push(PendingNotification {
                user_id: user_id.clone(),
                chat_id: profile.chat_id.clone(),
                text: event_reminder_text(&event, event.reminder_minutes_before),
            });
        }
    }
    out
}

/// Goal deadline (daily 09:00 local): fires for active goals whose
/// `target_date - today` is exactly 7, 3, 1 or 0 days.
pub fn collect_goal_deadlines(store: &dyn Store, now_utc: DateTime<Utc>) -> Vec<PendingNotification> {
    const TARGET_HOUR: u32 = 9;
    let mut out = Vec::new();
    let user_ids = match store.list_user_ids() {
        Ok(ids) => ids,
        Err(e) => {
            error!("goal deadline job: failed to list users: {e}");
            return out;
        }
    };
    for user_id in user_ids {
        let profile = match store.get_profile(&user_id) {
            Ok(Some(p)) => p,
            Ok(None) => continue,
            Err(e) => {
                error!(%user_id, "goal deadline job: {e}");
                continue;
            }
        };
        if !profile.notify_enabled || !profile.notify_goal_deadlines {
            continue;
        }
        let tz: Tz = parse_timezone(&profile.timezone).unwrap_or(chrono_tz::Europe::Moscow);
        let local_now = now_utc.with_timezone(&tz);
        if local_now.time().hour() != TARGET_HOUR || local_now.time().minute() != 0 {
            continue;
        }
        let today = local_now.date_naive();
        let goals = match store.list_goals(&user_id, Some(GoalStatus::Active)) {
            Ok(g) => g,
            Err(e) => {
                error!(%user_id, "goal deadline job: {e}");
                continue;
            }
        };
        for goal in goals {
            let Some(target) = goal.target_date else { continue };
            let days_left = (target - today).num_days();
            if ![7, 3, 1, 0].contains(&days_left) {
                continue;
            }
            let key = format!("goal:{}", goal.goal_id);
            match store.try_claim_dedup(&user_id, NotificationJobKind::GoalDeadline, &key, today) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    error!(%user_id, "goal deadline job dedup: {e}");
                    continue;
                }
            }
            out.push(PendingNotification {
                user_id: user_id.clone(),
                chat_id: profile.chat_id.clone(),
                text: goal_deadline_text(&goal, days_left),
            });
        }
    }
    out
}

/// Step reminder (daily 20:00 local): overdue steps grouped by goal.
pub fn collect_step_reminders(store: &dyn Store, now_utc: DateTime<Utc>) -> Vec<PendingNotification> {
    const TARGET_HOUR: u32 = 20;
    let mut out = Vec::new();
    let user_ids = match store.list_user_ids() {
        Ok(ids) => ids,
        Err(e) => {
            error!("step reminder job: failed to list users: {e}");
            return out;
        }
    };
    for user_id in user_ids {
        let profile = match store.get_profile(&user_id) {
            Ok(Some(p)) => p,
            Ok(None) => continue,
            Err(e) => {
                error!(%user_id, "step reminder job: {e}");
                continue;
            }
        };
        if !profile.notify_enabled || !profile.notify_step_reminders {
            continue;
        }
        let tz: Tz = parse_timezone(&profile.timezone).unwrap_or(chrono_tz::Europe::Moscow);
        let local_now = now_utc.with_timezone(&tz);
        if local_now.time().hour() != TARGET_HOUR || local_now.time().minute() != 0 {
            continue;
        }
        let today = local_now.date_naive();
        let goals = match store.list_goals(&user_id, Some(GoalStatus::Active)) {
            Ok(g) => g,
            Err(e) => {
                error!(%user_id, "step reminder job: {e}");
                continue;
            }
        };
        for goal in goals {
            let steps = match store.list_steps(&user_id, goal.goal_id) {
                Ok(s) => s,
                Err(e) => {
                    error!(%user_id, "step reminder job: {e}");
                    continue;
                }
            };
            let overdue: Vec<_> = steps
                .iter()
                .filter(|s| {
                    matches!(s.status, StepStatus::Pending | StepStatus::InProgress)
                        && s.planned_date.is_some_and(|d| d < today)
                })
                .collect();
            if overdue.is_empty() {
                continue;
            }
            let key = format!("goal_steps:{}", goal.goal_id);
            match store.try_claim_dedup(&user_id, NotificationJobKind::StepReminder, &key, today) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    error!(%user_id, "step reminder job dedup: {e}");
                    continue;
                }
            }
            out.push(PendingNotification {
                user_id: user_id.clone(),
                chat_id: profile.chat_id.clone(),
                text: step_reminder_text(&goal.title, &overdue, today),
            });
        }
    }
    out
}

/// Motivation (daily 08:00 local): fires for any user with at least one
/// active goal.
pub fn collect_motivation(store: &dyn Store, now_utc: DateTime<Utc>) -> Vec<PendingNotification> {
    const TARGET_HOUR: u32 = 8;
    let mut out = Vec::new();
    let user_ids = match store.list_user_ids() {
        Ok(ids) => ids,
        Err(e) => {
            error!("motivation job: failed to list users: {e}");
            return out;
        }
    };
    for user_id in user_ids {
        let profile = match store.get_profile(&user_id) {
            Ok(Some(p)) => p,
            Ok(None) => continue,
            Err(e) => {
                error!(%user_id, "motivation job: {e}");
                continue;
            }
        };
        if !profile.notify_enabled || !profile.notify_motivation {
            continue;
        }
        let tz: Tz = parse_timezone(&profile.timezone).unwrap_or(chrono_tz::Europe::Moscow);
        let local_now = now_utc.with_timezone(&tz);
        if local_now.time().hour() != TARGET_HOUR || local_now.time().minute() != 0 {
            continue;
        }
        let today = local_now.date_naive();
        let goals = match store.list_goals(&user_id, Some(GoalStatus::Active)) {
            Ok(g) => g,
            Err(e) => {
                error!(%user_id, "motivation job: {e}");
                continue;
            }
        };
        if goals.is_empty() {
            continue;
        }
        let key = "daily".to_string();
        match store.try_claim_dedup(&user_id, NotificationJobKind::Motivation, &key, today) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                error!(%user_id, "motivation job dedup: {e}");
                continue;
            }
        }
        out.push(PendingNotification {
            user_id: user_id.clone(),
            chat_id: profile.chat_id.clone(),
            text: motivation_text(&goals),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_store::models::{NewEvent, NewGoal};
    use waypoint_store::SqliteStore;

    /// S4 — notification dedup: an event reminder fires once inside its
    /// window; a second job run within the same local day for the same
    /// event must not fire again.
    #[test]
    fn event_reminder_does_not_refire_within_the_same_window() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();

        let now = chrono::DateTime::parse_from_rfc3339("2026-08-04T06:45:00Z")
            .unwrap()
            .with_timezone(&Utc);
        // 09:45 Moscow local, event at 10:00 local, 15-minute reminder.
        store
            .create_event(
                &user_id,
                NewEvent {
                    title: "Встреча".into(),
                    date: now.with_timezone(&chrono_tz::Europe::Moscow).date_naive(),
                    time: chrono::NaiveTime::from_hms_opt(10, 0, 0),
                    duration_minutes: 60,
                    reminder_minutes_before: 15,
                    reminder_enabled: true,
                    ..Default::default()
                },
            )
            .unwrap();

        let first = collect_event_reminders(&store, now);
        assert_eq!(first.len(), 1, "event due inside the firing window should emit exactly once");

        // Simulated re-run of the same tick (e.g. a retried job) with the
        // identical "now" — the dedup claim, not a window drift, must be
        // what suppresses this.
        let second = collect_event_reminders(&store, now);
        assert!(second.is_empty(), "dedup key already claimed for this event/day must suppress a re-fire");
    }

    #[test]
    fn motivation_only_fires_for_users_with_an_active_goal_at_the_target_hour() {
        let store = SqliteStore::in_memory().unwrap();
        let with_goal = UserId::from("has-goal");
        let without_goal = UserId::from("no-goal");
        store.get_or_create_profile(&with_goal, "chat-1", "Europe/Moscow").unwrap();
        store.get_or_create_profile(&without_goal, "chat-2", "Europe/Moscow").unwrap();
        store
            .create_goal_with_steps(
                &with_goal,
                NewGoal {
                    title: "Цель".into(),
                    description: None,
                    target_date: None,
                    category: None,
                    priority: waypoint_core::types::Priority::Medium,
                },
                vec![],
            )
            .unwrap();

        // 08:00 Europe/Moscow == 05:00 UTC.
        let now = chrono::DateTime::parse_from_rfc3339("2026-08-04T05:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let pending = collect_motivation(&store, now);
        let recipients: Vec<_> = pending.iter().map(|p| p.user_id.clone()).collect();
        assert_eq!(recipients, vec![with_goal]);
    }

    #[test]
    fn motivation_does_not_fire_outside_the_target_hour() {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        store
            .create_goal_with_steps(
                &user_id,
                NewGoal {
                    title: "Цель".into(),
                    description: None,
                    target_date: None,
                    category: None,
                    priority: waypoint_core::types::Priority::Medium,
                },
                vec![],
            )
            .unwrap();
        let now = chrono::DateTime::parse_from_rfc3339("2026-08-04T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(collect_motivation(&store, now).is_empty());
    }
}
