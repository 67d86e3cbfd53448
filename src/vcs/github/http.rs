//! GitHub REST v3 implementation of [`GitHubApi`]

use std::time::Duration;

use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderMap, LINK};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::FETCH_TIMEOUT_MS;
use crate::vcs::api::GitHubApi;
use crate::vcs::error::ApiError;
use crate::vcs::types::{
    GitCommit, GitReference, PullRequest, PullRequestFilter, RefNamespace, Repository,
};

/// Default base URL for GitHub API
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Suffix appended to a GitHub Enterprise host to reach its API root
pub const ENTERPRISE_API_PATH: &str = "/api/v3";

pub const USER_AGENT: &str = "hal-vcs";

const PER_PAGE: &str = "100";

pub struct HttpGitHubApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpGitHubApi {
    /// Creates an authenticated API handle rooted at `base_url`
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base_url` followed by `segments`, each percent-encoded as one path segment
    fn endpoint<'a, I>(&self, segments: I) -> Result<Url, ApiError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let invalid = |reason: String| ApiError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_endpoint(&self, owner: &str, repo: &str, rest: &[&str]) -> Result<Url, ApiError> {
        self.endpoint(["repos", owner, repo].into_iter().chain(rest.iter().copied()))
    }

    async fn get(&self, mut url: Url, query: &[(&str, String)]) -> Result<reqwest::Response, ApiError> {
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/vnd.github+json")
            .bearer_auth(&self.token)
            .send()
            .await?;

        check_status(response, url.as_str())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let target = url.to_string();
        let response = self.get(url, &[]).await?;
        decode(response, &target).await
    }

    /// Follows `Link: rel="next"` until the result set is exhausted
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: Url,
        mut query: Vec<(&str, String)>,
    ) -> Result<Vec<T>, ApiError> {
        query.push(("per_page", PER_PAGE.to_string()));

        let first = url.to_string();
        let mut url = url;
        let mut items = Vec::new();
        let mut pages = 0;

        loop {
            let target = url.to_string();
            let response = self.get(url, &query).await?;
            let next = next_page_url(response.headers());
            let page: Vec<T> = decode(response, &target).await?;
            pages += 1;
            items.extend(page);

            match next {
                Some(next) => {
                    // The next link already carries the query string.
                    url = Url::parse(&next).map_err(|e| ApiError::InvalidUrl {
                        url: next.clone(),
                        reason: e.to_string(),
                    })?;
                    query.clear();
                }
                None => break,
            }
        }

        debug!("Fetched {} items in {} pages from {}", items.len(), pages, first);
        Ok(items)
    }
}

fn check_status(response: reqwest::Response, url: &str) -> Result<reqwest::Response, ApiError> {
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(url.to_string()));
    }

    let rate_limit_exhausted = status == reqwest::StatusCode::FORBIDDEN
        && response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || rate_limit_exhausted {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(ApiError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    if !status.is_success() {
        warn!("GitHub API returned status {}: {}", status, url);
        return Err(ApiError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T, ApiError> {
    response.json().await.map_err(|e| {
        warn!("Failed to parse GitHub response from {}: {}", url, e);
        ApiError::InvalidResponse(e.to_string())
    })
}

fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;

    link.split(',').find_map(|part| {
        let mut sections = part.split(';');
        let target = sections
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;
        sections
            .any(|section| section.trim() == r#"rel="next""#)
            .then(|| target.to_string())
    })
}

#[async_trait::async_trait]
impl GitHubApi for HttpGitHubApi {
    async fn show_reference(
        &self,
        owner: &str,
        repo: &str,
        namespace: RefNamespace,
        name: &str,
    ) -> Result<GitReference, ApiError> {
        // A ref name keeps its `/` separators; every part between them is encoded.
        let mut path = vec!["git", "ref", namespace.as_str()];
        path.extend(name.split('/'));
        self.get_json(self.repo_endpoint(owner, repo, &path)?).await
    }

    async fn list_references(
        &self,
        owner: &str,
        repo: &str,
        namespace: RefNamespace,
    ) -> Result<Vec<GitReference>, ApiError> {
        let url = self.repo_endpoint(owner, repo, &["git", "refs", namespace.as_str()])?;
        self.get_all_pages(url, Vec::new()).await
    }

    async fn show_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, ApiError> {
        let number = number.to_string();
        self.get_json(self.repo_endpoint(owner, repo, &["pulls", number.as_str()])?)
            .await
    }

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        filter: &PullRequestFilter,
    ) -> Result<Vec<PullRequest>, ApiError> {
        let url = self.repo_endpoint(owner, repo, &["pulls"])?;
        self.get_all_pages(url, filter.query()).await
    }

    async fn show_commit(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<GitCommit, ApiError> {
        self.get_json(self.repo_endpoint(owner, repo, &["git", "commits", sha])?)
            .await
    }

    async fn show_repository(&self, owner: &str, repo: &str) -> Result<Repository, ApiError> {
        self.get_json(self.repo_endpoint(owner, repo, &[])?).await
    }

    async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<serde_json::Value, ApiError> {
        let range = format!("{base}...{head}");
        self.get_json(self.repo_endpoint(owner, repo, &["compare", range.as_str()])?)
            .await
    }
}
