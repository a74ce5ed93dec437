//! The dialog state enum: exactly one per user,
//! persisted as `(state, state_context)` in the store's `session_states`
//! table as a single row per user.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalEditField {
    Title,
    Description,
    Deadline,
    Category,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEditField {
    Title,
    Date,
    Time,
    Duration,
    Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEditField {
    Title,
    Date,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Idle,
    GoalClarification,
    GoalEdit(GoalEditField),
    EventEdit(EventEditField),
    StepEdit(StepEditField),
    SchedulePrefsDays,
    SchedulePrefsTime,
}

impl DialogState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DialogState::Idle)
    }
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DialogState::Idle => "IDLE".to_string(),
            DialogState::GoalClarification => "GOAL_CLARIFICATION".to_string(),
            DialogState::GoalEdit(field) => {
                let field = match field {
                    GoalEditField::Title => "title",
                    GoalEditField::Description => "description",
                    GoalEditField::Deadline => "deadline",
                    GoalEditField::Category => "category",
                    GoalEditField::Priority => "priority",
                };
                format!("GOAL_EDIT_{field}")
            }
            DialogState::EventEdit(field) => {
                let field = match field {
                    EventEditField::Title => "title",
                    EventEditField::Date => "date",
                    EventEditField::Time => "time",
                    EventEditField::Duration => "duration",
                    EventEditField::Notes => "notes",
                };
                format!("EVENT_EDIT_{field}")
            }
            DialogState::StepEdit(field) => {
                let field = match field {
                    StepEditField::Title => "title",
                    StepEditField::Date => "date",
                    StepEditField::Time => "time",
                };
                format!("STEP_EDIT_{field}")
            }
            DialogState::SchedulePrefsDays => "SCHEDULE_PREFS_DAYS".to_string(),
            DialogState::SchedulePrefsTime => "SCHEDULE_PREFS_TIME".to_string(),
        };
        write!(f, "{s}")
    }
}

impl FromStr for DialogState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "IDLE" => DialogState::Idle,
            "GOAL_CLARIFICATION" => DialogState::GoalClarification,
            "GOAL_EDIT_title" => DialogState::GoalEdit(GoalEditField::Title),
            "GOAL_EDIT_description" => DialogState::GoalEdit(GoalEditField::Description),
            "GOAL_EDIT_deadline" => DialogState::GoalEdit(GoalEditField::Deadline),
            "GOAL_EDIT_category" => DialogState::GoalEdit(GoalEditField::Category),
            "GOAL_EDIT_priority" => DialogState::GoalEdit(GoalEditField::Priority),
            "EVENT_EDIT_title" => DialogState::EventEdit(EventEditField::Title),
            "EVENT_EDIT_date" => DialogState::EventEdit(EventEditField::Date),
            "EVENT_EDIT_time" => DialogState::EventEdit(EventEditField::Time),
            "EVENT_EDIT_duration" => DialogState::EventEdit(EventEditField::Duration),
            "EVENT_EDIT_notes" => DialogState::EventEdit(EventEditField::Notes),
            "STEP_EDIT_title" => DialogState::StepEdit(StepEditField::Title),
            "STEP_EDIT_date" => DialogState::StepEdit(StepEditField::Date),
            "STEP_EDIT_time" => DialogState::StepEdit(StepEditField::Time),
            "SCHEDULE_PREFS_DAYS" => DialogState::SchedulePrefsDays,
            "SCHEDULE_PREFS_TIME" => DialogState::SchedulePrefsTime,
            other => return Err(format!("unknown dialog state: {other}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_round_trips_through_its_display_string() {
        let states = [
            DialogState::Idle,
            DialogState::GoalClarification,
            DialogState::GoalEdit(GoalEditField::Title),
            DialogState::GoalEdit(GoalEditField::Priority),
            DialogState::EventEdit(EventEditField::Notes),
            DialogState::StepEdit(StepEditField::Date),
            DialogState::SchedulePrefsDays,
            DialogState::SchedulePrefsTime,
        ];
        for state in states {
            let parsed: DialogState = state.to_string().parse().unwrap();
            assert_eq!(parsed.to_string(), state.to_string());
        }
    }
}
