//! Phase 3 — Placement. Pure and store-agnostic: takes
//! the available days plus a busy-interval lookup closure and returns where
//! each step lands, leaving the actual writes (and their single enclosing
//! transaction) to the caller.

use chrono::{NaiveDate, NaiveTime};

use crate::decompose::DecomposedStep;

const SLOT_INCREMENT_MINUTES: i64 = 30;
const DAY_END: (u32, u32) = (23, 59);

#[derive(Debug, Clone)]
pub struct Placement {
    pub step_order: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct PlacementPlan {
    pub placements: Vec<Placement>,
    /// Set when any step had to be placed after `target_date` — the
    /// dispatcher surfaces this as a "tight deadline" advisory.
    pub tight_deadline: bool,
}

/// `busy_lookup` returns the day's busy intervals on first call for that
/// day; this function accumulates its own placements into the same running
/// per-day interval list so later steps see earlier steps' placements.
pub fn place_steps(
    available_days: &[NaiveDate],
    preferred_hour: NaiveTime,
    target_date: Option<NaiveDate>,
    steps: &[DecomposedStep],
    mut busy_lookup: impl FnMut(NaiveDate) -> Vec<(NaiveTime, NaiveTime)>,
) -> PlacementPlan {
    let mut day_cursor = 0usize;
    let mut occupied: std::collections::HashMap<NaiveDate, Vec<(NaiveTime, NaiveTime)>> =
        std::collections::HashMap::new();
    let mut placements = Vec::with_capacity(steps.len());
    let mut tight_deadline = false;

    for step in steps {
        let needed_minutes = (step.estimated_hours * 60.0).ceil() as i64;

        loop {
            if day_cursor >= available_days.len() {
                // Exhausted the whole window; keep placing on the final
                // day back-to-back rather than dropping the step.
                day_cursor = available_days.len().saturating_sub(1);
            }
            let day = available_days[day_cursor];
            let intervals = occupied
                .entry(day)
                .or_insert_with(|| busy_lookup(day))
                .clone();

            match find_free_slot(&intervals, preferred_hour, needed_minutes) {
                Some(start) => {
                    let end = start + chrono::Duration::minutes(needed_minutes);
                    occupied.get_mut(&day).unwrap().push((start, end));
                    if let Some(target) = target_date {
                        if day > target {
                            tight_deadline = true;
                        }
                    }
                    placements.push(Placement {
                        step_order: step.order,
                        date: day,
                        time: start,
                        duration_minutes: needed_minutes,
                    });
                    break;
                }
                None => {
                    if day_cursor + 1 < available_days.len() {
                        day_cursor += 1;
                        continue;
                    } else {
                        // No more candidate days at all: still place it on
                        // the last day, stacked after everything else
                        // already there, and flag the advisory.
                        let end_of_day =
                            NaiveTime::from_hms_opt(DAY_END.0, DAY_END.1, 0).unwrap();
                        let start = intervals
                            .iter()
                            .map(|(_, e)| *e)
                            .max()
                            .unwrap_or(preferred_hour)
                            .min(end_of_day);
                        let end = start + chrono::Duration::minutes(needed_minutes);
                        occupied.get_mut(&day).unwrap().push((start, end));
                        tight_deadline = true;
                        placements.push(Placement {
                            step_order: step.order,
                            date: day,
                            time: start,
                            duration_minutes: needed_minutes,
                        });
                        break;
                    }
                }
            }
        }
    }

    PlacementPlan {
        placements,
        tight_deadline,
    }
}

/// Finds the earliest time on this day, starting from `preferred_hour` and
/// advancing by 30-minute increments, with a free window of `needed_minutes`.
/// Returns `None` if the day has no such window left.
fn find_free_slot(
    busy: &[(NaiveTime, NaiveTime)],
    preferred_hour: NaiveTime,
    needed_minutes: i64,
) -> Option<NaiveTime> {
    let day_end = NaiveTime::from_hms_opt(DAY_END.0, DAY_END.1, 0).unwrap();
    let mut candidate = preferred_hour;
    loop {
        let candidate_end = candidate + chrono::Duration::minutes(needed_minutes);
        if candidate_end > day_end || candidate_end < candidate {
            return None;
        }
        let overlaps = busy
            .iter()
            .any(|(b_start, b_end)| candidate < *b_end && candidate_end > *b_start);
        if !overlaps {
            return Some(candidate);
        }
        candidate += chrono::Duration::minutes(SLOT_INCREMENT_MINUTES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 27).unwrap() + Duration::days(offset)
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn places_steps_on_consecutive_free_days() {
        let days = vec![day(0), day(1), day(2)];
        let steps = vec![
            DecomposedStep { title: "A".into(), estimated_hours: 1.0, order: 1 },
            DecomposedStep { title: "B".into(), estimated_hours: 1.0, order: 2 },
        ];
        let plan = place_steps(&days, time(9, 0), Some(day(5)), &steps, |_| vec![]);
        assert_eq!(plan.placements.len(), 2);
        assert!(!plan.tight_deadline);
    }

    #[test]
    fn advances_in_thirty_minute_increments_around_a_conflict() {
        let days = vec![day(0)];
        let steps = vec![DecomposedStep {
            title: "A".into(),
            estimated_hours: 1.0,
            order: 1,
        }];
        let plan = place_steps(&days, time(9, 0), Some(day(5)), &steps, |_| {
            vec![(time(9, 0), time(10, 0))]
        });
        assert_eq!(plan.placements[0].time, time(10, 0));
    }

    #[test]
    fn flags_tight_deadline_when_placement_exceeds_target_date() {
        let days = vec![day(0)];
        let steps = vec![
            DecomposedStep { title: "A".into(), estimated_hours: 20.0, order: 1 },
            DecomposedStep { title: "B".into(), estimated_hours: 20.0, order: 2 },
        ];
        let plan = place_steps(&days, time(9, 0), Some(day(0)), &steps, |_| vec![]);
        assert!(plan.tight_deadline);
    }
}
