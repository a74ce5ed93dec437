//! Per-variant dispatch contracts. Split
//! one file per entity family — `event.rs` covers `event.search` /
//! `event.mutate`, `goal.rs` covers every `goal.*` variant except
//! `goal.create` (which is a whole sub-flow owned by the orchestrator, not
//! a single store write), `product.rs` is the reserved stub.

pub mod event;
pub mod goal;
pub mod product;

use waypoint_core::types::{SetId, UserId};
use waypoint_intent::IdOrOrdinal;
use waypoint_resultcache::ResultSetCache;

use crate::error::{DispatchError, Result};

/// Resolves an intent's addressing target — a direct entity id, or a
/// `{set_id, ordinal}` pair against a previously returned Result Set —
/// never an invented entity id — into a concrete id.
pub(crate) fn resolve_target(
    cache: &ResultSetCache,
    user_id: &UserId,
    target: &IdOrOrdinal,
) -> Result<i64> {
    match target {
        IdOrOrdinal::Id(id) => Ok(*id),
        IdOrOrdinal::Ordinal { set_id, ordinal } => resolve_ordinal(cache, user_id, *set_id, *ordinal),
    }
}

fn resolve_ordinal(cache: &ResultSetCache, user_id: &UserId, set_id: SetId, ordinal: usize) -> Result<i64> {
    cache
        .resolve_ordinal(user_id, set_id, ordinal)
        .map_err(DispatchError::ResultCache)
}
