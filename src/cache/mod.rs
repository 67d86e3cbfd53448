//! Result cache used to memoize expensive remote calls
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌──────────────┐
//! │ GitHubClient │────▶│ NamespacedCache │────▶│ MemoryCache  │
//! │  (memoize)   │     │  (key prefix)   │     │ SqliteCache  │
//! └──────────────┘     └─────────────────┘     │ NoopCache    │
//!                                              └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`memory`]: In-process TTL map and the no-op cache
//! - [`namespaced`]: Key prefixing wrapper for sharing one backing store
//! - [`sqlite`]: SQLite-backed persistent cache
//! - [`error`]: Error types for cache operations

pub mod error;
pub mod memory;
pub mod namespaced;
pub mod sqlite;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

pub use error::CacheError;
pub use memory::{MemoryCache, NoopCache};
pub use namespaced::NamespacedCache;
pub use sqlite::SqliteCache;

/// Key/value store with optional per-entry TTL
///
/// A stored JSON `null` is a legitimate value (a cached "no result") and is
/// returned as `Some(Value::Null)`; only a missing or expired key is `None`.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Returns true if an entry was removed
    fn delete(&self, key: &str) -> Result<bool, CacheError>;

    fn clear(&self) -> Result<(), CacheError>;

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }
}

/// Read a typed value, treating any cache failure or undecodable entry as a miss.
///
/// The outer `Option` is hit/miss; the inner value may itself be an `Option`
/// when absent results are cached.
pub fn load<T: DeserializeOwned>(cache: &dyn ResultCache, key: &str) -> Option<T> {
    let value = match cache.get(key) {
        Ok(Some(value)) => value,
        Ok(None) => {
            debug!("Cache miss: {}", key);
            return None;
        }
        Err(e) => {
            debug!("Cache read failed for {}: {}", key, e);
            return None;
        }
    };

    serde_json::from_value(value)
        .inspect_err(|e| debug!("Discarding undecodable cache entry {}: {}", key, e))
        .ok()
}

/// Write a typed value, logging and ignoring failures.
pub fn store<T: Serialize>(cache: &dyn ResultCache, key: &str, value: &T, ttl: Duration) {
    let result = serde_json::to_value(value)
        .map_err(CacheError::from)
        .and_then(|value| cache.set(key, value, Some(ttl)));

    if let Err(e) = result {
        debug!("Cache write failed for {}: {}", key, e);
    }
}
