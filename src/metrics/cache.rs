use crate::bitstring::ContentKey;
use fnv::FnvHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Hit/miss counters since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Default)]
struct CacheState {
    values: FnvHashMap<(ContentKey, String), f64>,
    hits: u64,
    misses: u64,
}

/// Metric values keyed by (content key, metric id)
///
/// Bounded by `capacity`; inserting into a full cache clears it first.
/// Content is identified by [`ContentKey`] (length plus two independent
/// hashes) and never compared bit by bit.
pub struct MetricCache {
    state: Mutex<CacheState>,
    capacity: usize,
}

impl MetricCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: ContentKey, metric_id: &str) -> Option<f64> {
        let mut state = self.state.lock();
        let value = state.values.get(&(key, metric_id.to_string())).copied();
        if value.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        value
    }

    pub fn insert(&self, key: ContentKey, metric_id: &str, value: f64) {
        self.insert_if(key, metric_id, value, || true);
    }

    /// Insert only if `still_current` holds, evaluated under the cache lock
    ///
    /// Invalidations take the same lock, so one that races with this call
    /// runs either before the check or after the insert. Returns whether the
    /// value was stored.
    pub fn insert_if<F>(&self, key: ContentKey, metric_id: &str, value: f64, still_current: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let mut state = self.state.lock();
        if !still_current() {
            return false;
        }
        if state.values.len() >= self.capacity {
            tracing::debug!(capacity = self.capacity, "metric cache full, clearing");
            state.values.clear();
        }
        state.values.insert((key, metric_id.to_string()), value);
        true
    }

    /// Drop every cached value of one metric
    pub fn invalidate_metric(&self, metric_id: &str) {
        self.state.lock().values.retain(|(_, id), _| id != metric_id);
    }

    /// Drop every cached value computed from one bit string
    pub fn invalidate_content(&self, content_hash: u64) {
        self.state.lock().values.retain(|(key, _), _| key.hash != content_hash);
    }

    pub fn clear(&self) {
        self.state.lock().values.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            entries: state.values.len(),
        }
    }
}

impl std::fmt::Debug for MetricCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricCache")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(hash: u64) -> ContentKey {
        ContentKey {
            hash,
            check: hash.wrapping_mul(31),
            len: 8,
        }
    }

    #[test]
    fn test_get_and_insert() {
        let cache = MetricCache::new(8);
        assert_eq!(cache.get(key(1), "entropy"), None);
        cache.insert(key(1), "entropy", 0.5);
        assert_eq!(cache.get(key(1), "entropy"), Some(0.5));
        assert_eq!(cache.get(key(2), "entropy"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_primary_hash_collision_is_a_miss() {
        let cache = MetricCache::new(8);
        let stored = key(7);
        cache.insert(stored, "ones_count", 3.0);

        let other_content = ContentKey { check: 99, ..stored };
        let other_length = ContentKey { len: 9, ..stored };
        assert_eq!(cache.get(other_content, "ones_count"), None);
        assert_eq!(cache.get(other_length, "ones_count"), None);

        cache.insert(other_content, "ones_count", 2.0);
        assert_eq!(cache.get(stored, "ones_count"), Some(3.0));
        assert_eq!(cache.get(other_content, "ones_count"), Some(2.0));

        // both share the FNV hash, so invalidating it drops both
        cache.invalidate_content(7);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_if_checks_condition() {
        let cache = MetricCache::new(8);
        assert!(!cache.insert_if(key(1), "entropy", 0.5, || false));
        assert!(cache.is_empty());
        assert!(cache.insert_if(key(1), "entropy", 0.5, || true));
        assert_eq!(cache.get(key(1), "entropy"), Some(0.5));
    }

    #[test]
    fn test_invalidate_metric_and_content() {
        let cache = MetricCache::new(8);
        cache.insert(key(1), "entropy", 0.5);
        cache.insert(key(2), "entropy", 0.7);
        cache.insert(key(1), "length", 8.0);

        cache.invalidate_metric("entropy");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(key(1), "length"), Some(8.0));

        cache.insert(key(2), "length", 4.0);
        cache.invalidate_content(1);
        assert_eq!(cache.get(key(1), "length"), None);
        assert_eq!(cache.get(key(2), "length"), Some(4.0));
    }

    #[test]
    fn test_capacity_bound() {
        let cache = MetricCache::new(2);
        cache.insert(key(1), "a", 1.0);
        cache.insert(key(1), "b", 2.0);
        cache.insert(key(1), "c", 3.0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(key(1), "c"), Some(3.0));
        cache.clear();
        assert!(cache.is_empty());
    }
}
