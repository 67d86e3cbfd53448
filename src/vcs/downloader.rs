//! Source archive downloads

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::{DOWNLOAD_CONNECT_TIMEOUT_SECS, DOWNLOAD_TIMEOUT_SECS, MAX_REDIRECTS};
use crate::vcs::error::DownloadError;
use crate::vcs::github::http::USER_AGENT;

/// Retrieves a source archive for a reference
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Writes the archive for `reference` to `target`, returning the bytes written
    async fn download(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
        target: &Path,
    ) -> Result<u64, DownloadError>;
}

/// Transport settings for downloader HTTP clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for DownloaderOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DOWNLOAD_CONNECT_TIMEOUT_SECS),
            timeout: Duration::from_secs(DOWNLOAD_TIMEOUT_SECS),
            max_redirects: MAX_REDIRECTS,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Downloads tarballs through `{api_root}/repos/{owner}/{repo}/tarball/{ref}`.
///
/// The HTTP client never turns an error status into a transport error; the
/// status is inspected here instead.
pub struct GitHubDownloader {
    client: reqwest::Client,
    api_root: String,
}

impl GitHubDownloader {
    pub fn new(api_root: &str, token: &str, options: &DownloaderOptions) -> Option<Self> {
        let mut headers = HeaderMap::new();
        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .inspect_err(|e| warn!("Invalid token for downloader: {}", e))
            .ok()?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(&options.user_agent)
            .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .build()
            .inspect_err(|e| warn!("Failed to build downloader client: {}", e))
            .ok()?;

        Some(Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn archive_url(&self, owner: &str, repo: &str, reference: &str) -> Result<Url, DownloadError> {
        let invalid = |reason: String| DownloadError::InvalidUrl {
            url: self.api_root.clone(),
            reason,
        };

        let mut url = Url::parse(&self.api_root).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["repos", owner, repo, "tarball"])
            .extend(reference.split('/'));
        Ok(url)
    }
}

/// Directory that will hold `target`, where the partial download is staged
fn staging_dir(target: &Path) -> &Path {
    target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

#[async_trait::async_trait]
impl Downloader for GitHubDownloader {
    async fn download(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
        target: &Path,
    ) -> Result<u64, DownloadError> {
        let url = self.archive_url(owner, repo, reference)?;
        debug!("Downloading {}", url);

        let mut response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Archive download returned status {}: {}", status, url);
            return Err(DownloadError::Status(status.as_u16()));
        }

        // Deleted on drop unless persisted.
        let partial = tempfile::Builder::new()
            .prefix(".hal-vcs-")
            .suffix(".part")
            .tempfile_in(staging_dir(target))?;
        let mut file = tokio::fs::File::from_std(partial.reopen()?);

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        partial.persist(target).map_err(|e| e.error)?;

        info!("Downloaded {} bytes from {} to {:?}", written, url, target);
        Ok(written)
    }
}
