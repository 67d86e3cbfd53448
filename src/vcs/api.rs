//! Remote capability consumed by the resolver and the client

#[cfg(test)]
use mockall::automock;

use crate::vcs::error::ApiError;
use crate::vcs::types::{
    GitCommit, GitReference, PullRequest, PullRequestFilter, RefNamespace, Repository,
};

/// Operations against a GitHub-compatible REST API
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait GitHubApi: Send + Sync {
    /// Shows a single ref, e.g. `(Tags, "v1.0.0")` for `refs/tags/v1.0.0`
    async fn show_reference(
        &self,
        owner: &str,
        repo: &str,
        namespace: RefNamespace,
        name: &str,
    ) -> Result<GitReference, ApiError>;

    /// Lists every ref in the namespace, across all pages
    async fn list_references(
        &self,
        owner: &str,
        repo: &str,
        namespace: RefNamespace,
    ) -> Result<Vec<GitReference>, ApiError>;

    async fn show_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, ApiError>;

    /// Lists every pull request matching the filter, across all pages
    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        filter: &PullRequestFilter,
    ) -> Result<Vec<PullRequest>, ApiError>;

    async fn show_commit(&self, owner: &str, repo: &str, sha: &str)
    -> Result<GitCommit, ApiError>;

    async fn show_repository(&self, owner: &str, repo: &str) -> Result<Repository, ApiError>;

    /// Raw comparison payload between two commits
    async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<serde_json::Value, ApiError>;
}
