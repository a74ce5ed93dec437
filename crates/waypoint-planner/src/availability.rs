//! Phase 2 — Availability map. Builds the ordered list
//! of candidate days the placement pass (Phase 3) walks; busy intervals are
//! fetched lazily per day from `list_busy_intervals` since walking the map
//! doesn't require every day's intervals up front.

use chrono::{Duration, NaiveDate};

/// `D = max(14, days_until(target_date))`, capped at 90.
pub fn availability_window_days(today: NaiveDate, target_date: Option<NaiveDate>) -> i64 {
    let days_until = target_date
        .map(|d| (d - today).num_days().max(0))
        .unwrap_or(0);
    days_until.max(14).min(90)
}

/// The days within the window whose weekday is in the user's preferred set
/// (0=Mon..6=Sun). An empty preference set means "every day is available",
/// since a user who skipped `SCHEDULE_PREFS_DAYS` entirely (all sub-flow
/// steps are still driven by explicit callbacks) shouldn't get zero
/// candidate days.
pub fn build_available_days(
    today: NaiveDate,
    target_date: Option<NaiveDate>,
    preferred_weekdays: &[u8],
) -> Vec<NaiveDate> {
    let window = availability_window_days(today, target_date);
    (0..window)
        .map(|offset| today + Duration::days(offset))
        .filter(|day| {
            preferred_weekdays.is_empty()
                || preferred_weekdays.contains(&(day.weekday().num_days_from_monday() as u8))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_floors_at_fourteen_days() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let soon = today + Duration::days(3);
        assert_eq!(availability_window_days(today, Some(soon)), 14);
    }

    #[test]
    fn window_caps_at_ninety_days() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let far = today + Duration::days(400);
        assert_eq!(availability_window_days(today, Some(far)), 90);
    }

    #[test]
    fn filters_to_preferred_weekdays_only() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap(); // Monday
        let days = build_available_days(today, None, &[0, 2]); // Mon, Wed
        assert!(days
            .iter()
            .all(|d| d.weekday().num_days_from_monday() == 0 || d.weekday().num_days_from_monday() == 2));
        assert!(!days.is_empty());
    }

    #[test]
    fn empty_preference_set_means_every_day_available() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let days = build_available_days(today, None, &[]);
        assert_eq!(days.len(), 14);
    }
}
