//! [`VcsClient`] backed by a GitHub-compatible API

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::{self, ResultCache};
use crate::config::{REF_CACHE_TTL_SECS, URL_CACHE_TTL_SECS};
use crate::vcs::api::GitHubApi;
use crate::vcs::client::VcsClient;
use crate::vcs::error::ApiError;
use crate::vcs::errors::{ErrorList, ErrorMark};
use crate::vcs::resolver::RefResolver;
use crate::vcs::sorting::{compare_branches, compare_pull_requests, compare_tags};
use crate::vcs::types::{
    GitRef, PullRequest, PullRequestFilter, RefKind, RefNamespace, RefType, Repository,
    ResolvedRef,
};

const CACHE_KEY_ROOT: &str = "vcs_clients";

pub struct GitHubClient {
    api: Arc<dyn GitHubApi>,
    resolver: RefResolver,
    cache: Arc<dyn ResultCache>,
    key_prefix: String,
    errors: ErrorList,
}

impl GitHubClient {
    /// `key_prefix` scopes this client's cache entries, e.g. `gh.<provider id>`
    pub fn new(api: Arc<dyn GitHubApi>, cache: Arc<dyn ResultCache>, key_prefix: &str) -> Self {
        Self {
            resolver: RefResolver::new(api.clone()),
            api,
            cache,
            key_prefix: key_prefix.to_string(),
            errors: ErrorList::new(),
        }
    }

    fn cache_key(&self, owner: &str, repo: &str, suffix: &str) -> String {
        format!(
            "{}.{}.{}_{}",
            CACHE_KEY_ROOT,
            self.key_prefix,
            short_hash(&format!("{owner}{repo}")),
            suffix
        )
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        cache::load(self.cache.as_ref(), key)
    }

    fn remember<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        cache::store(self.cache.as_ref(), key, value, Duration::from_secs(ttl_secs));
    }

    /// Converts a remote failure into `None`, recording why.
    fn soft_fail<T>(&self, operation: &str, target: &str, result: Result<T, ApiError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                if e.is_not_found() {
                    debug!("{} found nothing for {}", operation, target);
                } else {
                    warn!("{} failed for {}: {}", operation, target, e);
                }
                self.errors
                    .add_error(format!("Failed to {} for {}: {}", operation, target, e));
                None
            }
        }
    }

    async fn references(&self, owner: &str, repo: &str, namespace: RefNamespace) -> Vec<GitRef> {
        let result = self.api.list_references(owner, repo, namespace).await;
        let operation = format!("list {}", namespace.as_str());

        self.soft_fail(&operation, &format!("{owner}/{repo}"), result)
            .unwrap_or_default()
            .into_iter()
            .map(|raw| GitRef::from_reference(namespace, raw))
            .collect()
    }
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..16])
}

/// Web URL for an already classified reference
pub fn reference_url(repository_url: &str, ref_type: &RefType) -> String {
    let value = &ref_type.value;
    match ref_type.kind {
        RefKind::Commit => format!("{repository_url}/commit/{value}"),
        RefKind::Tag => format!("{repository_url}/releases/tag/{value}"),
        RefKind::PullRequest => format!("{repository_url}/pull/{value}"),
        RefKind::Branch => format!("{repository_url}/tree/{value}"),
    }
}

#[async_trait::async_trait]
impl VcsClient for GitHubClient {
    async fn resolve_ref(&self, owner: &str, repo: &str, reference: &str) -> Option<ResolvedRef> {
        let key = self.cache_key(owner, repo, &format!("ref_{}", short_hash(reference)));

        if let Some(resolved) = self.cached::<Option<ResolvedRef>>(&key) {
            debug!("Cache hit for reference {} in {}/{}", reference, owner, repo);
            return resolved;
        }

        let resolved = self.resolver.resolve(owner, repo, reference).await;
        if resolved.is_none() {
            self.errors.add_error(format!(
                "Reference \"{}\" could not be resolved in {}/{}",
                reference, owner, repo
            ));
        }

        self.remember(&key, &resolved, REF_CACHE_TTL_SECS);
        resolved
    }

    fn resolve_ref_type(&self, reference: &str) -> RefType {
        self.resolver.resolve_ref_type(reference)
    }

    async fn url_for_repository(&self, owner: &str, repo: &str) -> String {
        let key = self.cache_key(owner, repo, "repo_url");

        if let Some(url) = self.cached::<String>(&key) {
            return url;
        }

        let url = self
            .repository(owner, repo)
            .await
            .map(|r| r.html_url)
            .unwrap_or_default();

        // An empty URL means the lookup failed; let the next call retry.
        if !url.is_empty() {
            self.remember(&key, &url, URL_CACHE_TTL_SECS);
        }
        url
    }

    async fn url_for_reference(&self, owner: &str, repo: &str, reference: &str) -> String {
        let key = self.cache_key(owner, repo, &format!("ref_url_{}", short_hash(reference)));

        if let Some(url) = self.cached::<String>(&key) {
            return url;
        }

        let repository_url = self.url_for_repository(owner, repo).await;
        if repository_url.is_empty() {
            return String::new();
        }

        let url = reference_url(&repository_url, &self.resolve_ref_type(reference));
        self.remember(&key, &url, URL_CACHE_TTL_SECS);
        url
    }

    async fn branches(&self, owner: &str, repo: &str) -> Vec<GitRef> {
        let mut branches = self.references(owner, repo, RefNamespace::Heads).await;
        branches.sort_by(compare_branches);
        branches
    }

    async fn tags(&self, owner: &str, repo: &str) -> Vec<GitRef> {
        let mut tags = self.references(owner, repo, RefNamespace::Tags).await;
        tags.sort_by(compare_tags);
        tags
    }

    async fn pull_requests(
        &self,
        owner: &str,
        repo: &str,
        filter: &PullRequestFilter,
    ) -> Vec<PullRequest> {
        let result = self.api.list_pull_requests(owner, repo, filter).await;
        let mut pulls = self
            .soft_fail("list pull requests", &format!("{owner}/{repo}"), result)
            .unwrap_or_default();
        pulls.sort_by(compare_pull_requests);
        pulls
    }

    async fn pull_request(&self, owner: &str, repo: &str, number: u64) -> Option<PullRequest> {
        let result = self.api.show_pull_request(owner, repo, number).await;
        self.soft_fail(
            "show pull request",
            &format!("{owner}/{repo}#{number}"),
            result,
        )
    }

    async fn repository(&self, owner: &str, repo: &str) -> Option<Repository> {
        let result = self.api.show_repository(owner, repo).await;
        self.soft_fail("show repository", &format!("{owner}/{repo}"), result)
    }

    async fn diff(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Option<serde_json::Value> {
        let result = self.api.compare_commits(owner, repo, base, head).await;
        self.soft_fail(
            "compare commits",
            &format!("{owner}/{repo} {base}...{head}"),
            result,
        )
    }

    fn errors(&self) -> Vec<String> {
        self.errors.errors()
    }

    fn error_mark(&self) -> ErrorMark {
        self.errors.mark()
    }

    fn errors_since(&self, mark: ErrorMark) -> Vec<String> {
        self.errors.errors_since(mark)
    }

    fn reset_errors(&self) {
        self.errors.reset_errors();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, NoopCache};
    use crate::vcs::api::MockGitHubApi;
    use crate::vcs::types::{GitCommit, GitObject, GitReference};
    use mockall::predicate::eq;
    use serde_json::json;

    const SHA: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";
    const REPO_URL: &str = "https://github.com/hal/agent";

    fn client(api: MockGitHubApi) -> GitHubClient {
        GitHubClient::new(Arc::new(api), Arc::new(MemoryCache::new()), "gh.1")
    }

    fn reference(name: &str) -> GitReference {
        GitReference {
            reference: name.to_string(),
            object: GitObject {
                sha: SHA.to_string(),
                object_type: "commit".to_string(),
            },
        }
    }

    fn repository() -> Repository {
        serde_json::from_value(json!({
            "full_name": "hal/agent",
            "html_url": REPO_URL,
            "default_branch": "main"
        }))
        .unwrap()
    }

    fn pull(number: u64, state: &str, updated_at: &str) -> PullRequest {
        serde_json::from_value(json!({
            "number": number,
            "state": state,
            "updated_at": updated_at,
            "head": {"ref": "feature", "sha": SHA},
            "base": {"ref": "main", "sha": SHA}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn resolve_ref_is_memoized_within_ttl() {
        let mut api = MockGitHubApi::new();
        api.expect_show_reference()
            .with(eq("hal"), eq("agent"), eq(RefNamespace::Heads), eq("main"))
            .times(1)
            .returning(|_, _, _, _| Ok(reference("refs/heads/main")));

        let client = client(api);
        let first = client.resolve_ref("hal", "agent", "main").await;
        let second = client.resolve_ref("hal", "agent", "main").await;

        assert_eq!(first, Some(ResolvedRef::new("main", SHA)));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unresolved_ref_is_cached_and_reported() {
        let mut api = MockGitHubApi::new();
        api.expect_show_reference()
            .times(1)
            .returning(|_, _, _, name| Err(ApiError::NotFound(name.to_string())));

        let client = client(api);

        assert_eq!(client.resolve_ref("hal", "agent", "gone").await, None);
        assert_eq!(client.resolve_ref("hal", "agent", "gone").await, None);
        assert_eq!(
            client.errors(),
            vec![r#"Reference "gone" could not be resolved in hal/agent"#]
        );
    }

    #[tokio::test]
    async fn resolve_ref_without_cache_calls_remote_each_time() {
        let mut api = MockGitHubApi::new();
        api.expect_show_commit()
            .times(2)
            .returning(|_, _, sha| {
                Ok(GitCommit {
                    sha: sha.to_string(),
                })
            });

        let client = GitHubClient::new(Arc::new(api), Arc::new(NoopCache), "gh.1");
        client.resolve_ref("hal", "agent", SHA).await;
        let resolved = client.resolve_ref("hal", "agent", SHA).await;

        assert_eq!(resolved, Some(ResolvedRef::new("commit", SHA)));
    }

    #[tokio::test]
    async fn resolve_ref_type_does_not_touch_remote() {
        let client = client(MockGitHubApi::new());

        assert_eq!(
            client.resolve_ref_type("tag/v1.2.3"),
            RefType::new(RefKind::Tag, "v1.2.3")
        );
        assert_eq!(
            client.resolve_ref_type(SHA),
            RefType::new(RefKind::Commit, SHA)
        );
        assert_eq!(
            client.resolve_ref_type("main"),
            RefType::new(RefKind::Branch, "main")
        );
    }

    #[tokio::test]
    async fn url_for_repository_is_cached() {
        let mut api = MockGitHubApi::new();
        api.expect_show_repository()
            .times(1)
            .returning(|_, _| Ok(repository()));

        let client = client(api);

        assert_eq!(client.url_for_repository("hal", "agent").await, REPO_URL);
        assert_eq!(client.url_for_repository("hal", "agent").await, REPO_URL);
    }

    #[tokio::test]
    async fn url_for_repository_is_empty_when_remote_fails() {
        let mut api = MockGitHubApi::new();
        api.expect_show_repository()
            .times(2)
            .returning(|_, _| Err(ApiError::InvalidResponse("bad".to_string())));

        let client = client(api);

        assert_eq!(client.url_for_repository("hal", "agent").await, "");
        assert_eq!(client.url_for_repository("hal", "agent").await, "");
        assert_eq!(client.errors().len(), 2);
    }

    #[tokio::test]
    async fn url_for_reference_uses_template_per_kind() {
        let mut api = MockGitHubApi::new();
        api.expect_show_repository()
            .times(1)
            .returning(|_, _| Ok(repository()));

        let client = client(api);

        assert_eq!(
            client.url_for_reference("hal", "agent", SHA).await,
            format!("{REPO_URL}/commit/{SHA}")
        );
        assert_eq!(
            client.url_for_reference("hal", "agent", "tag/v1.2.3").await,
            format!("{REPO_URL}/releases/tag/v1.2.3")
        );
        assert_eq!(
            client.url_for_reference("hal", "agent", "pull/42").await,
            format!("{REPO_URL}/pull/42")
        );
        assert_eq!(
            client.url_for_reference("hal", "agent", "feature/x").await,
            format!("{REPO_URL}/tree/feature/x")
        );
    }

    #[tokio::test]
    async fn branches_are_stripped_and_sorted() {
        let mut api = MockGitHubApi::new();
        api.expect_list_references()
            .with(eq("hal"), eq("agent"), eq(RefNamespace::Heads))
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![
                    reference("refs/heads/zeta"),
                    reference("refs/heads/Alpha"),
                    reference("refs/heads/master"),
                ])
            });

        let client = client(api);
        let names: Vec<String> = client
            .branches("hal", "agent")
            .await
            .into_iter()
            .map(|b| b.name)
            .collect();

        assert_eq!(names, vec!["master", "Alpha", "zeta"]);
    }

    #[tokio::test]
    async fn tags_are_sorted_by_version() {
        let mut api = MockGitHubApi::new();
        api.expect_list_references()
            .with(eq("hal"), eq("agent"), eq(RefNamespace::Tags))
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![
                    reference("refs/tags/v1.2.0"),
                    reference("refs/tags/v1.10.0"),
                    reference("refs/tags/v1.9.1"),
                ])
            });

        let client = client(api);
        let names: Vec<String> = client
            .tags("hal", "agent")
            .await
            .into_iter()
            .map(|t| t.name)
            .collect();

        assert_eq!(names, vec!["v1.10.0", "v1.9.1", "v1.2.0"]);
    }

    #[tokio::test]
    async fn listing_failure_returns_empty_and_records_error() {
        let mut api = MockGitHubApi::new();
        api.expect_list_references().times(1).returning(|_, _, _| {
            Err(ApiError::RateLimited {
                retry_after_secs: None,
            })
        });

        let client = client(api);

        assert!(client.branches("hal", "agent").await.is_empty());
        assert_eq!(client.errors().len(), 1);
    }

    #[tokio::test]
    async fn pull_requests_are_sorted() {
        let mut api = MockGitHubApi::new();
        api.expect_list_pull_requests().times(1).returning(|_, _, _| {
            Ok(vec![
                pull(1, "closed", "2024-05-01T00:00:00Z"),
                pull(2, "open", "2024-01-01T00:00:00Z"),
                pull(3, "open", "2024-04-01T00:00:00Z"),
            ])
        });

        let client = client(api);
        let numbers: Vec<u64> = client
            .pull_requests("hal", "agent", &PullRequestFilter::default())
            .await
            .into_iter()
            .map(|p| p.number)
            .collect();

        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn pull_request_is_none_on_error() {
        let mut api = MockGitHubApi::new();
        api.expect_show_pull_request()
            .with(eq("hal"), eq("agent"), eq(9))
            .times(1)
            .returning(|_, _, _| Err(ApiError::NotFound("pull 9".to_string())));

        let client = client(api);

        assert_eq!(client.pull_request("hal", "agent", 9).await, None);
    }

    #[tokio::test]
    async fn repository_returns_metadata() {
        let mut api = MockGitHubApi::new();
        api.expect_show_repository()
            .times(1)
            .returning(|_, _| Ok(repository()));

        let client = client(api);
        let repo = client.repository("hal", "agent").await.unwrap();

        assert_eq!(repo.default_branch, "main");
    }

    #[tokio::test]
    async fn diff_passes_payload_through() {
        let mut api = MockGitHubApi::new();
        api.expect_compare_commits()
            .with(eq("hal"), eq("agent"), eq("abc"), eq("def"))
            .times(1)
            .returning(|_, _, _, _| Ok(json!({"status": "behind", "behind_by": 3})));

        let client = client(api);

        assert_eq!(
            client.diff("hal", "agent", "abc", "def").await,
            Some(json!({"status": "behind", "behind_by": 3}))
        );
    }

    #[tokio::test]
    async fn errors_since_mark_excludes_earlier_failures() {
        let mut api = MockGitHubApi::new();
        api.expect_show_repository()
            .times(1)
            .returning(|_, _| Err(ApiError::InvalidResponse("bad".to_string())));
        api.expect_show_reference()
            .times(1)
            .returning(|_, _, _, _| Ok(reference("refs/heads/main")));

        let client = client(api);
        assert_eq!(client.repository("hal", "agent").await, None);

        let mark = client.error_mark();
        let resolved = client.resolve_ref("hal", "agent", "main").await;

        assert_eq!(resolved, Some(ResolvedRef::new("main", SHA)));
        assert!(client.errors_since(mark).is_empty());
        assert_eq!(client.errors().len(), 1);
    }

    #[tokio::test]
    async fn reset_errors_clears_recorded_failures() {
        let mut api = MockGitHubApi::new();
        api.expect_show_repository()
            .times(1)
            .returning(|_, _| Err(ApiError::InvalidResponse("bad".to_string())));

        let client = client(api);
        client.repository("hal", "agent").await;
        client.reset_errors();

        assert!(client.errors().is_empty());
    }

    #[test]
    fn cache_keys_are_scoped_by_prefix_and_repository() {
        let first = GitHubClient::new(
            Arc::new(MockGitHubApi::new()),
            Arc::new(NoopCache),
            "gh.1",
        );
        let second = GitHubClient::new(
            Arc::new(MockGitHubApi::new()),
            Arc::new(NoopCache),
            "ghe.2",
        );

        assert_ne!(
            first.cache_key("hal", "agent", "repo_url"),
            second.cache_key("hal", "agent", "repo_url")
        );
        assert_ne!(
            first.cache_key("hal", "agent", "repo_url"),
            first.cache_key("hal", "other", "repo_url")
        );
        assert!(first
            .cache_key("hal", "agent", "repo_url")
            .starts_with("vcs_clients.gh.1."));
    }
}
