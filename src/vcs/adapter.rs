//! Adapter trait: one implementation per provider type

use std::sync::Arc;

use crate::vcs::client::VcsClient;
use crate::vcs::downloader::Downloader;
use crate::vcs::errors::ErrorList;
use crate::vcs::types::{ProviderConfig, ProviderType};

/// Validates a provider configuration and builds clients and downloaders for it
pub trait VcsAdapter: Send + Sync {
    /// Returns the provider type this adapter handles
    fn provider_type(&self) -> ProviderType;

    /// Returns a ready client, or the reason one could not be built
    fn try_build_client(&self, config: &ProviderConfig) -> Result<Arc<dyn VcsClient>, String>;

    /// Returns a ready downloader, or the reason one could not be built
    fn try_build_downloader(&self, config: &ProviderConfig)
    -> Result<Arc<dyn Downloader>, String>;

    fn errors(&self) -> &ErrorList;

    /// Returns a ready client, or `None` with the reason recorded in [`VcsAdapter::errors`]
    fn build_client(&self, config: &ProviderConfig) -> Option<Arc<dyn VcsClient>> {
        self.try_build_client(config)
            .inspect_err(|reason| self.errors().add_error(reason.as_str()))
            .ok()
    }

    /// Returns a ready downloader, or `None` with the reason recorded in [`VcsAdapter::errors`]
    fn build_downloader(&self, config: &ProviderConfig) -> Option<Arc<dyn Downloader>> {
        self.try_build_downloader(config)
            .inspect_err(|reason| self.errors().add_error(reason.as_str()))
            .ok()
    }
}
