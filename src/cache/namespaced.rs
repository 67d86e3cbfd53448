//! Key-prefixing wrapper so independent consumers can share one store

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::cache::{CacheError, ResultCache};

pub const DEFAULT_DELIMITER: &str = ".";

pub struct NamespacedCache {
    inner: Arc<dyn ResultCache>,
    namespace: String,
    delimiter: String,
}

impl NamespacedCache {
    pub fn new(inner: Arc<dyn ResultCache>, namespace: &str) -> Self {
        Self::with_delimiter(inner, namespace, DEFAULT_DELIMITER)
    }

    pub fn with_delimiter(inner: Arc<dyn ResultCache>, namespace: &str, delimiter: &str) -> Self {
        Self {
            inner,
            namespace: namespace.to_string(),
            delimiter: delimiter.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}{}", self.namespace, self.delimiter, key)
    }
}

impl ResultCache for NamespacedCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.inner.get(&self.key(key))
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.inner.set(&self.key(key), value, ttl)
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.delete(&self.key(key))
    }

    /// Clears the whole backing store, not only this namespace.
    fn clear(&self) -> Result<(), CacheError> {
        self.inner.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use serde_json::json;

    #[test]
    fn keys_are_prefixed_in_backing_store() {
        let backing = Arc::new(MemoryCache::new());
        let cache = NamespacedCache::new(backing.clone(), "vcs");
        cache.set("ref", json!("abc"), None).unwrap();

        assert_eq!(backing.get("vcs.ref").unwrap(), Some(json!("abc")));
        assert_eq!(cache.get("ref").unwrap(), Some(json!("abc")));
    }

    #[test]
    fn namespaces_do_not_collide() {
        let backing: Arc<dyn ResultCache> = Arc::new(MemoryCache::new());
        let first = NamespacedCache::new(backing.clone(), "first");
        let second = NamespacedCache::with_delimiter(backing, "second", ":");

        first.set("key", json!(1), None).unwrap();
        second.set("key", json!(2), None).unwrap();

        assert_eq!(first.get("key").unwrap(), Some(json!(1)));
        assert_eq!(second.get("key").unwrap(), Some(json!(2)));
        assert!(first.delete("key").unwrap());
        assert_eq!(second.get("key").unwrap(), Some(json!(2)));
    }
}
