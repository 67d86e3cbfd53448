use std::sync::Arc;

use crate::cache::ResultCache;
use crate::vcs::adapter::VcsAdapter;
use crate::vcs::adapters::{AdapterCore, Endpoint};
use crate::vcs::client::VcsClient;
use crate::vcs::downloader::{Downloader, DownloaderOptions};
use crate::vcs::errors::ErrorList;
use crate::vcs::github::http::ENTERPRISE_API_PATH;
use crate::vcs::types::{ProviderConfig, ProviderType};

pub const MISCONFIGURED: &str = "GitHub Enterprise Version Control Provider is misconfigured.";

const URL_PARAMETERS: &[&str] = &["ghe.url", "url"];
const TOKEN_PARAMETERS: &[&str] = &["ghe.token", "token"];

/// Adapter for self-hosted GitHub Enterprise; the API root is the configured
/// host followed by `/api/v3`.
pub struct GitHubEnterpriseAdapter {
    core: AdapterCore,
}

impl GitHubEnterpriseAdapter {
    pub fn new(cache: Arc<dyn ResultCache>) -> Self {
        Self {
            core: AdapterCore::new(ProviderType::GitHubEnterprise, MISCONFIGURED, cache),
        }
    }

    pub fn with_downloader_options(mut self, options: DownloaderOptions) -> Self {
        self.core.set_downloader_options(options);
        self
    }
}

/// `https://git.example.com/` -> `https://git.example.com/api/v3`
pub fn api_root(url: &str) -> String {
    format!("{}{}", url.trim_end_matches('/'), ENTERPRISE_API_PATH)
}

fn endpoint(config: &ProviderConfig) -> Option<Endpoint> {
    let url = config.parameter(URL_PARAMETERS)?;
    let token = config.parameter(TOKEN_PARAMETERS)?;
    Some(Endpoint {
        api_root: api_root(url),
        token: token.to_string(),
    })
}

impl VcsAdapter for GitHubEnterpriseAdapter {
    fn provider_type(&self) -> ProviderType {
        self.core.provider_type()
    }

    fn try_build_client(&self, config: &ProviderConfig) -> Result<Arc<dyn VcsClient>, String> {
        self.core.build_client(config, endpoint)
    }

    fn try_build_downloader(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn Downloader>, String> {
        self.core.build_downloader(config, endpoint)
    }

    fn errors(&self) -> &ErrorList {
        self.core.errors()
    }
}
