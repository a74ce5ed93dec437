//! `event.search` / `event.mutate`.

use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};
use waypoint_core::types::{ResultKind, UserId};
use waypoint_intent::intent::{EventMutateParams, EventSearchParams, MutateOp};
use waypoint_resultcache::ResultSetCache;
use waypoint_store::models::{EventPatch, NewEvent};
use waypoint_store::Store;

use crate::error::{DispatchError, Result};
use crate::response::ProcessResponse;

use super::resolve_target;

/// Returns an ordered event list, creates a Result Set, and includes the
/// new `set_id` in the response.
pub fn search(store: &dyn Store, cache: &ResultSetCache, user_id: &UserId, params: &EventSearchParams) -> Result<ProcessResponse> {
    let events = store.list_events(
        user_id,
        params.title_like.as_deref(),
        params.date_from,
        params.date_to,
        params.time_from,
        params.time_to,
    )?;
    let ids: Vec<i64> = events.iter().map(|e| e.event_id).collect();
    let set_id = cache.put(user_id, ResultKind::Events, ids);
    let text = if events.is_empty() {
        "Ничего не нашлось.".to_string()
    } else {
        format!("Нашёл {} событие(й).", events.len())
    };
    let items =
        serde_json::to_value(&events).map_err(|_| DispatchError::InvalidParams("event serialization failed".into()))?;
    Ok(ProcessResponse::render_table(text, items, set_id))
}

/// `op=create`: inserts an Event, overwrite semantics, no conflict check.
/// `op=update`/`op=delete`: resolve `target`, both require a prior Result
/// Set for ordinal mode.
pub fn mutate(store: &dyn Store, cache: &ResultSetCache, user_id: &UserId, params: &EventMutateParams) -> Result<ProcessResponse> {
    match params.op {
        MutateOp::Create => create(store, user_id, params),
        MutateOp::Update => update(store, cache, user_id, params),
        MutateOp::Delete => delete(store, cache, user_id, params),
    }
}

fn create(store: &dyn Store, user_id: &UserId, params: &EventMutateParams) -> Result<ProcessResponse> {
    let title = params
        .title
        .clone()
        .ok_or_else(|| DispatchError::InvalidParams("event.mutate create requires title".into()))?;
    let date = params
        .date
        .ok_or_else(|| DispatchError::InvalidParams("event.mutate create requires date".into()))?;
    let new_event = NewEvent {
        title,
        date,
        time: params.time,
        duration_minutes: params.duration_minutes.unwrap_or(60),
        ..Default::default()
    };
    let event = store.create_event(user_id, new_event)?;
    let when = match event.time {
        Some(t) => format!("{} {}", event.date.format("%Y-%m-%d"), t.format("%H:%M")),
        None => event.date.format("%Y-%m-%d").to_string(),
    };
    Ok(ProcessResponse::final_text(format!("Добавил событие «{}» на {}.", event.title, when)))
}

fn update(store: &dyn Store, cache: &ResultSetCache, user_id: &UserId, params: &EventMutateParams) -> Result<ProcessResponse> {
    let target = params
        .target
        .as_ref()
        .ok_or_else(|| DispatchError::InvalidParams("event.mutate update requires a target".into()))?;
    let event_id = resolve_target(cache, user_id, target)?;
    let patch = EventPatch {
        title: params.title.clone(),
        date: params.date,
        time: params.time.map(Some),
        duration_minutes: params.duration_minutes,
    };
    match store.update_event(user_id, event_id, patch) {
        Ok(event) => Ok(ProcessResponse::final_text(format!("Событие «{}» обновлено.", event.title))),
        Err(e) => Ok(ProcessResponse::from_taxonomy(e.taxonomy())),
    }
}

fn delete(store: &dyn Store, cache: &ResultSetCache, user_id: &UserId, params: &EventMutateParams) -> Result<ProcessResponse> {
    let target = params
        .target
        .as_ref()
        .ok_or_else(|| DispatchError::InvalidParams("event.mutate delete requires a target".into()))?;
    let event_id = resolve_target(cache, user_id, target)?;
    let deleted = store.delete_event(user_id, event_id)?;
    if deleted {
        Ok(ProcessResponse::final_text("Событие удалено."))
    } else {
        Ok(ProcessResponse::from_taxonomy(ErrorTaxonomy::ReferencesUnknownEntity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use waypoint_core::types::ResponseType;
    use waypoint_intent::intent::IdOrOrdinal;
    use waypoint_store::SqliteStore;

    fn setup() -> (SqliteStore, ResultSetCache, UserId) {
        let store = SqliteStore::in_memory().unwrap();
        let user_id = UserId::from("u1");
        store.get_or_create_profile(&user_id, "chat-1", "Europe/Moscow").unwrap();
        (store, ResultSetCache::new(64, 3600), user_id)
    }

    fn make_event(store: &SqliteStore, user_id: &UserId, title: &str, date: NaiveDate) -> i64 {
        store
            .create_event(
                user_id,
                NewEvent {
                    title: title.to_string(),
                    date,
                    ..Default::default()
                },
            )
            .unwrap()
            .event_id
    }

    /// S2 — ordinal delete: a prior `event.search` registers a Result Set;
    /// `{set_id, ordinal:2}` must resolve to the *second* id in that set,
    /// and a re-search afterwards must no longer contain it.
    #[test]
    fn ordinal_delete_removes_the_addressed_event_and_nothing_else() {
        let (store, cache, user_id) = setup();
        let d = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let e1 = make_event(&store, &user_id, "Первое", d);
        let e2 = make_event(&store, &user_id, "Второе", d + chrono::Duration::days(1));
        let e3 = make_event(&store, &user_id, "Третье", d + chrono::Duration::days(2));

        let search_response = search(&store, &cache, &user_id, &EventSearchParams::default()).unwrap();
        let set_id = search_response.set_id.expect("search registers a result set");

        let mutate_params = EventMutateParams {
            op: MutateOp::Delete,
            title: None,
            date: None,
            time: None,
            duration_minutes: None,
            target: Some(IdOrOrdinal::Ordinal { set_id, ordinal: 2 }),
        };
        let response = mutate(&store, &cache, &user_id, &mutate_params).unwrap();
        assert!(response.success);

        let remaining = store.list_events(&user_id, None, None, None, None, None).unwrap();
        let remaining_ids: Vec<i64> = remaining.iter().map(|e| e.event_id).collect();
        assert_eq!(remaining_ids, vec![e1, e3]);
        assert!(!remaining_ids.contains(&e2));
    }

    #[test]
    fn ordinal_zero_is_rejected_as_unknown_entity() {
        use waypoint_core::taxonomy::IntoTaxonomy;

        let (store, cache, user_id) = setup();
        make_event(&store, &user_id, "Единственное", NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
        let search_response = search(&store, &cache, &user_id, &EventSearchParams::default()).unwrap();
        let set_id = search_response.set_id.unwrap();

        let mutate_params = EventMutateParams {
            op: MutateOp::Delete,
            title: None,
            date: None,
            time: None,
            duration_minutes: None,
            target: Some(IdOrOrdinal::Ordinal { set_id, ordinal: 0 }),
        };
        let err = mutate(&store, &cache, &user_id, &mutate_params).unwrap_err();
        let response = ProcessResponse::from_taxonomy(err.taxonomy());
        assert!(!response.success);
        assert_eq!(response.response_type, ResponseType::FinalText);
    }

    #[test]
    fn create_inserts_with_overwrite_semantics_and_no_conflict_check() {
        let (store, cache, user_id) = setup();
        let d = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let params = EventMutateParams {
            op: MutateOp::Create,
            title: Some("Встреча".into()),
            date: Some(d),
            time: None,
            duration_minutes: Some(30),
            target: None,
        };
        mutate(&store, &cache, &user_id, &params).unwrap();
        mutate(&store, &cache, &user_id, &params).unwrap();
        let events = store.list_events(&user_id, None, None, None, None, None).unwrap();
        assert_eq!(events.len(), 2, "no conflict check means both events are kept");
    }
}
