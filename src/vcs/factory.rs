//! Provider-agnostic entry point
//!
//! Routes a [`ProviderConfig`] to the adapter registered for its type. When
//! an adapter fails, the reason it returned for that call is recorded in the
//! factory so callers see the specific diagnostic. The adapter's own error
//! list is left untouched.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::vcs::adapter::VcsAdapter;
use crate::vcs::client::VcsClient;
use crate::vcs::downloader::Downloader;
use crate::vcs::errors::ErrorList;
use crate::vcs::types::{ProviderConfig, ProviderType};

pub const NO_VALID_PROVIDER: &str =
    "No valid Version Control Provider was found. Hal may be misconfigured.";

/// Registry of adapters keyed by provider type, fixed once built
#[derive(Default)]
pub struct VcsFactory {
    adapters: HashMap<ProviderType, Arc<dyn VcsAdapter>>,
    errors: ErrorList,
}

impl VcsFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` for its provider type, replacing any earlier one
    pub fn with_adapter(mut self, adapter: Arc<dyn VcsAdapter>) -> Self {
        self.adapters.insert(adapter.provider_type(), adapter);
        self
    }

    pub fn supports(&self, provider_type: ProviderType) -> bool {
        self.adapters.contains_key(&provider_type)
    }

    pub fn authenticate(&self, config: &ProviderConfig) -> Option<Arc<dyn VcsClient>> {
        self.dispatch(config, |adapter| adapter.try_build_client(config))
    }

    pub fn downloader(&self, config: &ProviderConfig) -> Option<Arc<dyn Downloader>> {
        self.dispatch(config, |adapter| adapter.try_build_downloader(config))
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.errors()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.has_errors()
    }

    pub fn reset_errors(&self) {
        self.errors.reset_errors();
    }

    fn adapter(&self, config: &ProviderConfig) -> Option<&Arc<dyn VcsAdapter>> {
        config
            .parsed_type()
            .and_then(|provider_type| self.adapters.get(&provider_type))
    }

    fn dispatch<T, F>(&self, config: &ProviderConfig, build: F) -> Option<T>
    where
        F: FnOnce(&dyn VcsAdapter) -> Result<T, String>,
    {
        let Some(adapter) = self.adapter(config) else {
            warn!(
                "No adapter registered for provider {} of type {:?}",
                config.id, config.provider_type
            );
            self.errors.add_error(NO_VALID_PROVIDER);
            return None;
        };

        match build(adapter.as_ref()) {
            Ok(built) => Some(built),
            Err(reason) => {
                debug!(
                    "Adapter {} failed for provider {}: {}",
                    adapter.provider_type(),
                    config.id,
                    reason
                );
                self.errors.add_error(reason);
                None
            }
        }
    }
}
