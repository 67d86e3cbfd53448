//! GitHub-flavored adapters
//!
//! Both flavors validate a [`ProviderConfig`] the same way and differ only in
//! how they derive the API root and token from it. [`AdapterCore`] holds the
//! shared half: the injected result cache, the client pool and the error list.

mod github;
mod github_enterprise;

pub use github::GitHubAdapter;
pub use github_enterprise::GitHubEnterpriseAdapter;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::ResultCache;
use crate::config::CLIENT_CACHE_TTL_SECS;
use crate::vcs::client::VcsClient;
use crate::vcs::client_pool::{ClientKey, ClientPool};
use crate::vcs::downloader::{Downloader, DownloaderOptions, GitHubDownloader};
use crate::vcs::errors::ErrorList;
use crate::vcs::github::GitHubClient;
use crate::vcs::github::http::HttpGitHubApi;
use crate::vcs::types::{ProviderConfig, ProviderType};

/// API root and credentials extracted from a provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub api_root: String,
    pub token: String,
}

pub(crate) struct AdapterCore {
    provider_type: ProviderType,
    misconfigured: &'static str,
    cache: Arc<dyn ResultCache>,
    pool: ClientPool,
    downloader_options: DownloaderOptions,
    errors: ErrorList,
}

impl AdapterCore {
    pub fn new(
        provider_type: ProviderType,
        misconfigured: &'static str,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        Self {
            provider_type,
            misconfigured,
            cache,
            pool: ClientPool::new(Duration::from_secs(CLIENT_CACHE_TTL_SECS)),
            downloader_options: DownloaderOptions::default(),
            errors: ErrorList::new(),
        }
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }

    pub fn set_downloader_options(&mut self, options: DownloaderOptions) {
        self.downloader_options = options;
    }

    fn misconfigured(&self) -> String {
        self.misconfigured.to_string()
    }

    fn check_type(&self, config: &ProviderConfig) -> Result<(), String> {
        if config.parsed_type() == Some(self.provider_type) {
            return Ok(());
        }
        warn!(
            "Provider {} has type {:?}, expected {}",
            config.id, config.provider_type, self.provider_type
        );
        Err(self.misconfigured())
    }

    fn require_endpoint<F>(&self, config: &ProviderConfig, endpoint: F) -> Result<Endpoint, String>
    where
        F: FnOnce(&ProviderConfig) -> Option<Endpoint>,
    {
        endpoint(config).ok_or_else(|| {
            warn!("Provider {} is missing required parameters", config.id);
            self.misconfigured()
        })
    }

    /// Type check, pool lookup, parameter check, then construction
    pub fn build_client<F>(
        &self,
        config: &ProviderConfig,
        endpoint: F,
    ) -> Result<Arc<dyn VcsClient>, String>
    where
        F: FnOnce(&ProviderConfig) -> Option<Endpoint>,
    {
        self.check_type(config)?;

        let key = ClientKey::new(self.provider_type, &config.id);
        self.pool.get_or_build(&key, || {
            let endpoint = self.require_endpoint(config, endpoint)?;

            let api = HttpGitHubApi::new(&endpoint.api_root, &endpoint.token).map_err(|e| {
                warn!("Failed to build API client for {}: {}", key, e);
                self.misconfigured()
            })?;

            info!("Built {} client for {}", self.provider_type, endpoint.api_root);
            let key_prefix = format!("{}.{}", self.provider_type.short_key(), config.id);
            let client = GitHubClient::new(Arc::new(api), self.cache.clone(), &key_prefix);
            Ok(Arc::new(client) as Arc<dyn VcsClient>)
        })
    }

    pub fn build_downloader<F>(
        &self,
        config: &ProviderConfig,
        endpoint: F,
    ) -> Result<Arc<dyn Downloader>, String>
    where
        F: FnOnce(&ProviderConfig) -> Option<Endpoint>,
    {
        self.check_type(config)?;
        let endpoint = self.require_endpoint(config, endpoint)?;

        GitHubDownloader::new(&endpoint.api_root, &endpoint.token, &self.downloader_options)
            .map(|downloader| Arc::new(downloader) as Arc<dyn Downloader>)
            .ok_or_else(|| self.misconfigured())
    }
}
