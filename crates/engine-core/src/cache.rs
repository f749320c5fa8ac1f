use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
    num::NonZeroUsize,
};

/// Fixed-capacity cache that evicts the least recently used entry.
///
/// Recency is tracked in a queue with the most recently used key at the back.
/// Touching an entry is linear in the number of entries, which is fine for
/// the small capacities this is used with.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: NonZeroUsize,
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    hits: u64,
    misses: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.get()),
            order: VecDeque::with_capacity(capacity.get()),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a clone of the cached value and marks it as most recently used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                let value = value.clone();
                self.hits += 1;
                self.touch(key);
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts or replaces a value. Returns the evicted entry, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return None;
        }

        self.order.push_back(key);
        if self.entries.len() <= self.capacity.get() {
            return None;
        }

        let oldest = self.order.pop_front()?;
        self.entries.remove(&oldest).map(|value| (oldest, value))
    }

    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            len: self.entries.len(),
        }
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> LruCache<&'static str, u32> {
        LruCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = cache(2);
        cache.put("a", 1);
        cache.put("b", 2);

        // "a" becomes most recent, so "b" is evicted next
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.put("c", 3), Some(("b", 2)));

        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn replacing_a_key_does_not_grow_the_cache() {
        let mut cache = cache(2);
        cache.put("a", 1);
        cache.put("a", 10);
        cache.put("b", 2);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(10));
    }

    #[test]
    fn tracks_hits_and_misses() {
        let mut cache = cache(1);
        cache.put("a", 1);
        cache.get(&"a");
        cache.get(&"z");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.len, 1);
    }

    #[test]
    fn invalidate_removes_entry() {
        let mut cache = cache(2);
        cache.put("a", 1);
        assert_eq!(cache.invalidate(&"a"), Some(1));
        assert!(cache.is_empty());
        assert_eq!(cache.invalidate(&"a"), None);
    }
}
