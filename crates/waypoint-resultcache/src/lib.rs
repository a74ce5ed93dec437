//! The Result Set Reference System: a short-lived,
//! per-user, ordinal-addressable list returned by a search so follow-up
//! intents like "delete the second one" can resolve `{set_id, ordinal}`
//! pairs without the model ever inventing an entity id.
//!
//! Capacity and TTL are per-user, so each user gets its own `lru::LruCache<SetId, Entry>`
//! behind its own mutex — the `DashMap` gives lock-free routing to that
//! per-user cell.

pub mod error;

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use lru::LruCache;
use waypoint_core::types::{ResultKind, SetId, UserId};

pub use error::{ResultCacheError, Result};

#[derive(Debug, Clone)]
pub struct ResultSet {
    pub set_id: SetId,
    pub kind: ResultKind,
    pub ordered_ids: Vec<i64>,
}

struct Entry {
    set: ResultSet,
    last_touched: Instant,
}

pub struct ResultSetCache {
    per_user: DashMap<UserId, Mutex<LruCache<SetId, Entry>>>,
    capacity: NonZeroUsize,
    ttl: Duration,
}

impl ResultSetCache {
    pub fn new(capacity: usize, ttl_s: u64) -> Self {
        Self {
            per_user: DashMap::new(),
            capacity: NonZeroUsize::new(capacity.max(1)).unwrap(),
            ttl: Duration::from_secs(ttl_s),
        }
    }

    /// Store a new result set for `user_id`, returning its fresh [`SetId`].
    pub fn put(&self, user_id: &UserId, kind: ResultKind, ordered_ids: Vec<i64>) -> SetId {
        let set_id = SetId::new();
        let cell = self
            .per_user
            .entry(user_id.clone())
            .or_insert_with(|| Mutex::new(LruCache::new(self.capacity)));
        let mut cache = cell.lock().unwrap();
        cache.put(
            set_id,
            Entry {
                set: ResultSet {
                    set_id,
                    kind,
                    ordered_ids,
                },
                last_touched: Instant::now(),
            },
        );
        set_id
    }

    /// Fetch a result set, refreshing its TTL on access. Returns `None` if
    /// absent, evicted, or expired.
    pub fn get(&self, user_id: &UserId, set_id: SetId) -> Option<ResultSet> {
        let cell = self.per_user.get(user_id)?;
        let mut cache = cell.lock().unwrap();
        let entry = cache.get_mut(&set_id)?;
        if entry.last_touched.elapsed() > self.ttl {
            cache.pop(&set_id);
            return None;
        }
        entry.last_touched = Instant::now();
        Some(entry.set.clone())
    }

    /// Resolve a 1-based ordinal against a stored result set into the
    /// concrete entity id at that position. Ordinals are 1-based and
    /// must fall within `|ordered_ids|`.
    pub fn resolve_ordinal(&self, user_id: &UserId, set_id: SetId, ordinal: usize) -> Result<i64> {
        let set = self
            .get(user_id, set_id)
            .ok_or_else(|| ResultCacheError::SetNotFound(set_id.to_string()))?;
        if ordinal == 0 || ordinal > set.ordered_ids.len() {
            return Err(ResultCacheError::OrdinalOutOfRange {
                ordinal,
                len: set.ordered_ids.len(),
            });
        }
        Ok(set.ordered_ids[ordinal - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid() -> UserId {
        UserId::from("u1")
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = ResultSetCache::new(64, 3600);
        let set_id = cache.put(&uid(), ResultKind::Events, vec![42, 17, 88]);
        let set = cache.get(&uid(), set_id).unwrap();
        assert_eq!(set.ordered_ids, vec![42, 17, 88]);
    }

    #[test]
    fn resolve_ordinal_is_one_based() {
        let cache = ResultSetCache::new(64, 3600);
        let set_id = cache.put(&uid(), ResultKind::Events, vec![42, 17, 88]);
        assert_eq!(cache.resolve_ordinal(&uid(), set_id, 2).unwrap(), 17);
    }

    #[test]
    fn resolve_ordinal_zero_or_out_of_range_fails() {
        let cache = ResultSetCache::new(64, 3600);
        let set_id = cache.put(&uid(), ResultKind::Events, vec![42, 17, 88]);
        assert!(cache.resolve_ordinal(&uid(), set_id, 0).is_err());
        assert!(cache.resolve_ordinal(&uid(), set_id, 4).is_err());
    }

    #[test]
    fn capacity_evicts_lru_per_user() {
        let cache = ResultSetCache::new(1, 3600);
        let first = cache.put(&uid(), ResultKind::Events, vec![1]);
        let second = cache.put(&uid(), ResultKind::Events, vec![2]);
        assert!(cache.get(&uid(), first).is_none());
        assert!(cache.get(&uid(), second).is_some());
    }

    #[test]
    fn separate_users_do_not_share_capacity() {
        let cache = ResultSetCache::new(1, 3600);
        let a = cache.put(&UserId::from("a"), ResultKind::Goals, vec![1]);
        let b = cache.put(&UserId::from("b"), ResultKind::Goals, vec![2]);
        assert!(cache.get(&UserId::from("a"), a).is_some());
        assert!(cache.get(&UserId::from("b"), b).is_some());
    }
}
