//! Parses the fixed set of callback tokens a button press can carry.
//! Unknown tokens are not an error here — the caller
//! treats them as a fresh utterance instead, so parsing is total.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// `edit:<entity>:<field>:<id>` — enters the matching `*_EDIT_*` state.
    Edit {
        entity: String,
        field: String,
        id: i64,
    },
    /// `day_pref:<n>` — toggles weekday `n` (0=Mon..6=Sun) in `SCHEDULE_PREFS_DAYS`.
    DayPref(u8),
    DayPrefDone,
    /// `time_pref:<...>` — either a named slot (morning/afternoon/evening) or `HH:MM`.
    TimePref(String),
    TimePrefDone,
    Confirm { op: String, id: i64 },
    Cancel,
}

pub fn parse_callback(data: &str) -> Option<Callback> {
    if data == "cancel" {
        return Some(Callback::Cancel);
    }
    if data == "day_pref_done" {
        return Some(Callback::DayPrefDone);
    }
    if data == "time_pref_done" {
        return Some(Callback::TimePrefDone);
    }
    if let Some(rest) = data.strip_prefix("day_pref:") {
        return rest.parse::<u8>().ok().map(Callback::DayPref);
    }
    if let Some(rest) = data.strip_prefix("time_pref:") {
        return Some(Callback::TimePref(rest.to_string()));
    }
    if let Some(rest) = data.strip_prefix("edit:") {
        let mut parts = rest.splitn(3, ':');
        let entity = parts.next()?.to_string();
        let field = parts.next()?.to_string();
        let id: i64 = parts.next()?.parse().ok()?;
        return Some(Callback::Edit { entity, field, id });
    }
    if let Some(rest) = data.strip_prefix("confirm:") {
        let mut parts = rest.splitn(2, ':');
        let op = parts.next()?.to_string();
        let id: i64 = parts.next()?.parse().ok()?;
        return Some(Callback::Confirm { op, id });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edit_callback() {
        assert_eq!(
            parse_callback("edit:goal:title:42"),
            Some(Callback::Edit {
                entity: "goal".into(),
                field: "title".into(),
                id: 42
            })
        );
    }

    #[test]
    fn parses_day_pref_and_done() {
        assert_eq!(parse_callback("day_pref:3"), Some(Callback::DayPref(3)));
        assert_eq!(parse_callback("day_pref_done"), Some(Callback::DayPrefDone));
    }

    #[test]
    fn parses_cancel_and_confirm() {
        assert_eq!(parse_callback("cancel"), Some(Callback::Cancel));
        assert_eq!(
            parse_callback("confirm:goal.delete:7"),
            Some(Callback::Confirm {
                op: "goal.delete".into(),
                id: 7
            })
        );
    }

    #[test]
    fn rejects_unknown_token() {
        assert_eq!(parse_callback("whatever"), None);
    }
}
