//! Render cache.
//!
//! Maps a statement's identity (its explicit name, or the raw unrendered
//! buffer) to the final SQL text. Hits only take the read lock; entries are
//! never modified once stored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Snapshot of a render cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
pub(crate) struct RenderCache {
    map: RwLock<HashMap<String, Arc<str>>>,
    limit: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RenderCache {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            limit,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up `key`, counting a hit or a miss.
    pub(crate) fn get(&self, key: &str) -> Option<Arc<str>> {
        let found = self
            .map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `sql` under `key` unless another thread got there first, and
    /// return whichever entry ends up in the cache.
    pub(crate) fn insert(&self, key: &str, sql: Arc<str>) -> Arc<str> {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = map.get(key) {
            return existing.clone();
        }
        if let Some(limit) = self.limit {
            if map.len() >= limit {
                tracing::debug!(
                    target: "sqlweave.sql",
                    entries = map.len(),
                    limit,
                    "render cache limit reached, flushing"
                );
                *map = HashMap::new();
            }
        }
        map.insert(key.to_owned(), sql.clone());
        sql
    }

    /// Replace the map with an empty one, returning how many entries were dropped.
    pub(crate) fn clear(&self) -> usize {
        let old = std::mem::take(&mut *self.map.write().unwrap_or_else(PoisonError::into_inner));
        old.len()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.map.read().unwrap_or_else(PoisonError::into_inner).len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins() {
        let cache = RenderCache::new(None);
        let a = cache.insert("k", Arc::from("SELECT 1"));
        let b = cache.insert("k", Arc::from("SELECT 2"));
        assert_eq!(&*a, "SELECT 1");
        assert_eq!(&*b, "SELECT 1");
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn counts_hits_and_misses() {
        let cache = RenderCache::new(None);
        assert!(cache.get("k").is_none());
        cache.insert("k", Arc::from("x"));
        assert!(cache.get("k").is_some());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn limit_flushes_before_insert() {
        let cache = RenderCache::new(Some(2));
        cache.insert("a", Arc::from("a"));
        cache.insert("b", Arc::from("b"));
        cache.insert("c", Arc::from("c"));
        assert_eq!(cache.stats().entries, 1);
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn clear_drops_all_entries() {
        let cache = RenderCache::new(None);
        cache.insert("a", Arc::from("a"));
        assert_eq!(cache.clear(), 1);
        assert_eq!(cache.stats().entries, 0);
    }
}
