//! In-process caches

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheError, ResultCache};
use crate::config::MEMORY_CACHE_CAPACITY;

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Mutex-guarded map with lazy expiry. The default cache when none is configured.
///
/// Holds at most `capacity` entries. Inserting a new key into a full map
/// first drops every expired entry, then, if still full, the entry closest to
/// expiry.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    capacity: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_capacity(MEMORY_CACHE_CAPACITY)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Drop all expired entries, returning how many were removed
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.lock()?.is_empty())
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;

        if entries.len() >= self.capacity && !entries.contains_key(key) {
            entries.retain(|_, entry| !entry.is_expired(now));
            if entries.len() >= self.capacity {
                // Entries without a TTL go last.
                let evict = entries
                    .iter()
                    .min_by_key(|(_, entry)| (entry.expires_at.is_none(), entry.expires_at))
                    .map(|(key, _)| key.clone());
                if let Some(evict) = evict {
                    debug!("Memory cache full, evicting {}", evict);
                    entries.remove(&evict);
                }
            }
        }

        let expires_at = ttl.map(|ttl| now + ttl);
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.lock()?.remove(key).is_some())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.lock()?.clear();
        Ok(())
    }
}

/// Cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ResultCache for NoopCache {
    fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Ok(())
    }

    fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get_returns_value() {
        let cache = MemoryCache::new();
        cache.set("key", json!("value"), None).unwrap();

        assert_eq!(cache.get("key").unwrap(), Some(json!("value")));
        assert!(cache.has("key").unwrap());
    }

    #[test]
    fn expired_entries_are_misses() {
        let cache = MemoryCache::new();
        cache
            .set("key", json!(1), Some(Duration::from_millis(0)))
            .unwrap();

        assert_eq!(cache.get("key").unwrap(), None);
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn null_values_are_hits() {
        let cache = MemoryCache::new();
        cache.set("key", Value::Null, None).unwrap();

        assert_eq!(cache.get("key").unwrap(), Some(Value::Null));
    }

    #[test]
    fn delete_reports_whether_entry_existed() {
        let cache = MemoryCache::new();
        cache.set("key", json!(1), None).unwrap();

        assert!(cache.delete("key").unwrap());
        assert!(!cache.delete("key").unwrap());
    }

    #[test]
    fn purge_expired_keeps_live_entries() {
        let cache = MemoryCache::new();
        cache
            .set("stale", json!(1), Some(Duration::from_millis(0)))
            .unwrap();
        cache
            .set("live", json!(2), Some(Duration::from_secs(60)))
            .unwrap();
        cache.set("forever", json!(3), None).unwrap();

        assert_eq!(cache.purge_expired().unwrap(), 1);
        assert_eq!(cache.len().unwrap(), 2);
    }

    #[test]
    fn expired_entries_do_not_pile_up() {
        let cache = MemoryCache::with_capacity(100);
        for i in 0..10_000 {
            cache
                .set(&format!("key-{i}"), json!(i), Some(Duration::ZERO))
                .unwrap();
        }

        assert!(cache.len().unwrap() <= 100);
    }

    #[test]
    fn full_cache_evicts_entry_closest_to_expiry() {
        let cache = MemoryCache::with_capacity(2);
        cache.set("forever", json!(1), None).unwrap();
        cache
            .set("soon", json!(2), Some(Duration::from_secs(10)))
            .unwrap();
        cache
            .set("later", json!(3), Some(Duration::from_secs(60)))
            .unwrap();

        assert_eq!(cache.len().unwrap(), 2);
        assert_eq!(cache.get("soon").unwrap(), None);
        assert_eq!(cache.get("forever").unwrap(), Some(json!(1)));
        assert_eq!(cache.get("later").unwrap(), Some(json!(3)));
    }

    #[test]
    fn overwriting_a_key_in_a_full_cache_evicts_nothing() {
        let cache = MemoryCache::with_capacity(2);
        cache.set("a", json!(1), None).unwrap();
        cache.set("b", json!(2), None).unwrap();
        cache.set("a", json!(3), None).unwrap();

        assert_eq!(cache.get("a").unwrap(), Some(json!(3)));
        assert_eq!(cache.get("b").unwrap(), Some(json!(2)));
    }

    #[test]
    fn default_capacity_is_bounded() {
        assert_eq!(MemoryCache::new().capacity(), MEMORY_CACHE_CAPACITY);
    }

    #[test]
    fn clear_removes_everything() {
        let cache = MemoryCache::new();
        cache.set("a", json!(1), None).unwrap();
        cache.set("b", json!(2), None).unwrap();
        cache.clear().unwrap();

        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn noop_cache_never_stores() {
        let cache = NoopCache;
        cache.set("key", json!(1), None).unwrap();

        assert_eq!(cache.get("key").unwrap(), None);
        assert!(!cache.delete("key").unwrap());
    }
}
