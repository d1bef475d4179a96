//! Time-bounded dedupe cache for the polling transport.
//!
//! Keys map to expiry instants; an entry suppresses redelivery while fresh.
//! Stale entries are removed by a lazy sweep, and when the cache exceeds its
//! size budget the oldest-inserted entries are evicted first. Eviction is
//! FIFO-since-insertion, not LRU: refreshing an existing key's expiry does
//! not move it in the queue.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use flux_core::UpdateId;

/// Key under which a delivered update is remembered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupeKey {
    /// Numeric key (typically the platform update id).
    Int(i64),
    /// String key.
    Str(String),
}

impl From<i64> for DedupeKey {
    fn from(key: i64) -> Self {
        Self::Int(key)
    }
}

impl From<&str> for DedupeKey {
    fn from(key: &str) -> Self {
        Self::Str(key.to_owned())
    }
}

impl From<String> for DedupeKey {
    fn from(key: String) -> Self {
        Self::Str(key)
    }
}

impl From<UpdateId> for DedupeKey {
    fn from(id: UpdateId) -> Self {
        match id {
            UpdateId::Int(key) => Self::Int(key),
            UpdateId::Str(key) => Self::Str(key),
        }
    }
}

pub(crate) struct DedupeCache {
    ttl: Duration,
    max_size: usize,
    expiries: HashMap<DedupeKey, Instant>,
    // insertion order; drives FIFO eviction
    order: VecDeque<DedupeKey>,
}

impl DedupeCache {
    pub(crate) fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size,
            expiries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// A zero ttl or zero size budget disables dedupe entirely.
    pub(crate) fn enabled(&self) -> bool {
        !self.ttl.is_zero() && self.max_size > 0
    }

    pub(crate) fn is_suppressed(&self, key: &DedupeKey, now: Instant) -> bool {
        self.expiries.get(key).is_some_and(|expiry| *expiry > now)
    }

    pub(crate) fn record(&mut self, key: DedupeKey, now: Instant) {
        let expiry = now + self.ttl;
        if let Some(slot) = self.expiries.get_mut(&key) {
            // refresh in place; the key keeps its queue position
            *slot = expiry;
        } else {
            self.order.push_back(key.clone());
            self.expiries.insert(key, expiry);
        }

        self.sweep(now);
        while self.expiries.len() > self.max_size {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.expiries.remove(&oldest);
        }
    }

    fn sweep(&mut self, now: Instant) {
        self.expiries.retain(|_, expiry| *expiry > now);
        self.order.retain(|key| self.expiries.contains_key(key));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.expiries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl_ms: u64, max_size: usize) -> DedupeCache {
        DedupeCache::new(Duration::from_millis(ttl_ms), max_size)
    }

    #[test]
    fn suppresses_within_ttl_and_readmits_after() {
        let mut cache = cache(1000, 10);
        let start = Instant::now();
        let key = DedupeKey::Int(1);

        cache.record(key.clone(), start);
        assert!(cache.is_suppressed(&key, start + Duration::from_millis(500)));
        assert!(!cache.is_suppressed(&key, start + Duration::from_millis(1500)));
    }

    #[test]
    fn sweep_drops_stale_entries() {
        let mut cache = cache(100, 10);
        let start = Instant::now();

        cache.record(DedupeKey::Int(1), start);
        cache.record(DedupeKey::Int(2), start);
        assert_eq!(cache.len(), 2);

        cache.record(DedupeKey::Int(3), start + Duration::from_millis(200));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_oldest_inserted_beyond_budget() {
        let mut cache = cache(60_000, 2);
        let start = Instant::now();

        cache.record(DedupeKey::Int(1), start);
        cache.record(DedupeKey::Int(2), start + Duration::from_millis(1));
        // refreshing key 1 must not save it from FIFO eviction
        cache.record(DedupeKey::Int(1), start + Duration::from_millis(2));
        cache.record(DedupeKey::Int(3), start + Duration::from_millis(3));

        let now = start + Duration::from_millis(4);
        assert!(!cache.is_suppressed(&DedupeKey::Int(1), now));
        assert!(cache.is_suppressed(&DedupeKey::Int(2), now));
        assert!(cache.is_suppressed(&DedupeKey::Int(3), now));
    }

    #[test]
    fn zero_ttl_or_size_disables() {
        assert!(!cache(0, 10).enabled());
        assert!(!cache(1000, 0).enabled());
        assert!(cache(1000, 10).enabled());
    }

    #[test]
    fn string_and_int_keys_do_not_collide() {
        let mut cache = cache(60_000, 10);
        let start = Instant::now();

        cache.record(DedupeKey::Int(1), start);
        assert!(!cache.is_suppressed(&DedupeKey::from("1"), start));
    }
}
