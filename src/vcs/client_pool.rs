//! Short-lived reuse of built clients, keyed by provider
//!
//! The pool lock is held while a client is built, so concurrent callers for
//! the same key wait and then reuse the single client that was constructed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::vcs::client::VcsClient;
use crate::vcs::types::ProviderType;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    pub provider_type: ProviderType,
    pub provider_id: String,
}

impl ClientKey {
    pub fn new(provider_type: ProviderType, provider_id: &str) -> Self {
        Self {
            provider_type,
            provider_id: provider_id.to_string(),
        }
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.provider_type, self.provider_id)
    }
}

struct PooledClient {
    client: Arc<dyn VcsClient>,
    built_at: Instant,
}

pub struct ClientPool {
    ttl: Duration,
    clients: Mutex<HashMap<ClientKey, PooledClient>>,
}

impl ClientPool {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            clients: Mutex::new(HashMap::new()),
        }
    }

    // Pooled clients stay usable even if a builder panicked mid-insert.
    fn lock(&self) -> MutexGuard<'_, HashMap<ClientKey, PooledClient>> {
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the live client for `key`, or builds, stores and returns a new one.
    ///
    /// `build` runs at most once per key per TTL window; an error from it is
    /// returned and nothing is stored.
    pub fn get_or_build<F, E>(&self, key: &ClientKey, build: F) -> Result<Arc<dyn VcsClient>, E>
    where
        F: FnOnce() -> Result<Arc<dyn VcsClient>, E>,
    {
        let mut clients = self.lock();

        match clients.get(key) {
            Some(pooled) if pooled.built_at.elapsed() < self.ttl => {
                debug!("Reusing client {}", key);
                return Ok(pooled.client.clone());
            }
            Some(_) => {
                debug!("Client {} expired", key);
                clients.remove(key);
            }
            None => {}
        }

        let client = build()?;
        clients.insert(
            key.clone(),
            PooledClient {
                client: client.clone(),
                built_at: Instant::now(),
            },
        );
        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
