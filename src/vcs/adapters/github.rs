use std::sync::Arc;

use crate::cache::ResultCache;
use crate::vcs::adapter::VcsAdapter;
use crate::vcs::adapters::{AdapterCore, Endpoint};
use crate::vcs::client::VcsClient;
use crate::vcs::downloader::{Downloader, DownloaderOptions};
use crate::vcs::errors::ErrorList;
use crate::vcs::github::http::DEFAULT_API_URL;
use crate::vcs::types::{ProviderConfig, ProviderType};

pub const MISCONFIGURED: &str = "GitHub.com Version Control Provider is misconfigured.";

const TOKEN_PARAMETERS: &[&str] = &["gh.token", "token"];

/// Adapter for GitHub.com
pub struct GitHubAdapter {
    core: AdapterCore,
    api_url: String,
}

impl GitHubAdapter {
    pub fn new(cache: Arc<dyn ResultCache>) -> Self {
        Self {
            core: AdapterCore::new(ProviderType::GitHub, MISCONFIGURED, cache),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Points clients and downloaders at another API host
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_downloader_options(mut self, options: DownloaderOptions) -> Self {
        self.core.set_downloader_options(options);
        self
    }

    fn endpoint(&self, config: &ProviderConfig) -> Option<Endpoint> {
        if self.api_url.is_empty() {
            return None;
        }
        let token = config.parameter(TOKEN_PARAMETERS)?;
        Some(Endpoint {
            api_root: self.api_url.clone(),
            token: token.to_string(),
        })
    }
}

impl VcsAdapter for GitHubAdapter {
    fn provider_type(&self) -> ProviderType {
        self.core.provider_type()
    }

    fn try_build_client(&self, config: &ProviderConfig) -> Result<Arc<dyn VcsClient>, String> {
        self.core.build_client(config, |config| self.endpoint(config))
    }

    fn try_build_downloader(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn Downloader>, String> {
        self.core
            .build_downloader(config, |config| self.endpoint(config))
    }

    fn errors(&self) -> &ErrorList {
        self.core.errors()
    }
}
