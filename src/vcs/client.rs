//! Client trait exposed to callers once a provider is authenticated

use crate::vcs::errors::ErrorMark;
use crate::vcs::types::{GitRef, PullRequest, PullRequestFilter, RefType, Repository, ResolvedRef};

/// Authenticated handle to one configured provider.
///
/// No method fails loudly: remote problems yield the documented empty value
/// and a message in [`VcsClient::errors`]. A client may be shared by several
/// callers, so take an [`error_mark`](VcsClient::error_mark) before an
/// operation and read [`errors_since`](VcsClient::errors_since) after it.
#[async_trait::async_trait]
pub trait VcsClient: Send + Sync {
    /// Resolve a reference (`tag/<name>`, `pull/<n>`, sha, or branch) to a commit
    async fn resolve_ref(&self, owner: &str, repo: &str, reference: &str) -> Option<ResolvedRef>;

    /// Classify a reference without touching the remote
    fn resolve_ref_type(&self, reference: &str) -> RefType;

    /// Canonical web URL of the repository, or an empty string
    async fn url_for_repository(&self, owner: &str, repo: &str) -> String;

    /// Web URL for a reference, or an empty string if the repository URL is unknown
    async fn url_for_reference(&self, owner: &str, repo: &str, reference: &str) -> String;

    /// All branches, sorted
    async fn branches(&self, owner: &str, repo: &str) -> Vec<GitRef>;

    /// All tags, sorted
    async fn tags(&self, owner: &str, repo: &str) -> Vec<GitRef>;

    /// All pull requests matching `filter`, sorted
    async fn pull_requests(
        &self,
        owner: &str,
        repo: &str,
        filter: &PullRequestFilter,
    ) -> Vec<PullRequest>;

    async fn pull_request(&self, owner: &str, repo: &str, number: u64) -> Option<PullRequest>;

    async fn repository(&self, owner: &str, repo: &str) -> Option<Repository>;

    /// Comparison between two commits, passed through as returned by the remote
    async fn diff(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Option<serde_json::Value>;

    /// Messages recorded by failed operations
    fn errors(&self) -> Vec<String>;

    fn error_mark(&self) -> ErrorMark;

    /// Messages recorded after `mark`
    fn errors_since(&self, mark: ErrorMark) -> Vec<String>;

    fn reset_errors(&self);
}
