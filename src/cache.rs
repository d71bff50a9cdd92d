//! Bounded LRU cache of decoded entry payloads.
//!
//! Keyed by exact filename; a hit bumps the key to most-recently-used and
//! the counters make the hit rate observable.  Interior mutability keeps
//! every archive query at `&self`; each operation is one short critical
//! section.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// Default capacity in entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

pub struct ExtractionCache {
    inner: Mutex<Inner>,
}

struct Inner {
    map: LruCache<String, Vec<u8>>,
    hits: u64,
    misses: u64,
}

impl ExtractionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least one");
        Self { inner: Mutex::new(Inner { map: LruCache::new(capacity), hits: 0, misses: 0 }) }
    }

    /// Cached bytes for `exact_name`, bumping recency on hit.
    pub fn get(&self, exact_name: &str) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        match inner.map.get(exact_name).cloned() {
            Some(data) => {
                inner.hits += 1;
                Some(data)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert after a successful extraction, evicting the least-recently
    /// used entry when at capacity.
    pub fn insert(&self, exact_name: String, data: Vec<u8>) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.map.put(exact_name, data);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.map.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses) since creation; `clear` does not reset them.
    pub fn counters(&self) -> (u64, u64) {
        let inner = self.inner.lock().expect("cache lock poisoned");
        (inner.hits, inner.misses)
    }

    pub fn hit_rate(&self) -> f64 {
        let (hits, misses) = self.counters();
        if hits + misses == 0 {
            return 0.0;
        }
        hits as f64 / (hits + misses) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_bumps_recency() {
        let cache = ExtractionCache::new(2);
        cache.insert("a".into(), vec![1]);
        cache.insert("b".into(), vec![2]);
        // Touch `a`, making `b` the LRU victim.
        assert_eq!(cache.get("a"), Some(vec![1]));
        cache.insert("c".into(), vec![3]);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(vec![1]));
        assert_eq!(cache.get("c"), Some(vec![3]));
    }

    #[test]
    fn eviction_respects_capacity() {
        let cache = ExtractionCache::new(3);
        for i in 0..10 {
            cache.insert(format!("k{i}"), vec![i as u8]);
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("k9"), Some(vec![9]));
        assert_eq!(cache.get("k0"), None);
    }

    #[test]
    fn counters_and_clear() {
        let cache = ExtractionCache::new(4);
        cache.insert("x".into(), vec![0]);
        assert!(cache.get("x").is_some());
        assert!(cache.get("y").is_none());
        assert_eq!(cache.counters(), (1, 1));
        assert!((cache.hit_rate() - 0.5).abs() < f64::EPSILON);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.counters(), (1, 1));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cache = ExtractionCache::new(0);
        cache.insert("only".into(), vec![7]);
        assert_eq!(cache.get("only"), Some(vec![7]));
    }
}
