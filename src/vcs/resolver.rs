//! Reference classification and resolution
//!
//! A reference string is one of:
//!
//! - Tag: `tag/<name>`
//! - Pull request: `pull/<number>`
//! - Commit: 40 lowercase hex characters
//! - Branch: anything else
//!
//! Resolution tries tag, pull request, commit and branch lookups in that
//! order. A strategy whose pattern does not match is skipped without a remote
//! call; the first lookup that yields a sha wins.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::vcs::api::GitHubApi;
use crate::vcs::error::ApiError;
use crate::vcs::types::{RefKind, RefNamespace, RefType, ResolvedRef};

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tag/(.+)$").expect("valid tag pattern"));
static PULL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^pull/(\d+)$").expect("valid pull pattern"));
static COMMIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("valid commit pattern"));

/// Label used for references resolved as commits
pub const COMMIT_LABEL: &str = "commit";

/// Returns the tag name if `reference` is `tag/<name>`
pub fn parse_tag(reference: &str) -> Option<&str> {
    TAG_PATTERN
        .captures(reference)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Returns the pull request number if `reference` is `pull/<number>`
pub fn parse_pull(reference: &str) -> Option<&str> {
    PULL_PATTERN
        .captures(reference)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Returns the reference itself if it is a full commit sha
pub fn parse_commit(reference: &str) -> Option<&str> {
    COMMIT_PATTERN.is_match(reference).then_some(reference)
}

/// Classify a reference. Never fails: unmatched references are branches.
pub fn resolve_ref_type(reference: &str) -> RefType {
    if let Some(tag) = parse_tag(reference) {
        return RefType::new(RefKind::Tag, tag);
    }

    if let Some(pull) = parse_pull(reference) {
        return RefType::new(RefKind::PullRequest, pull);
    }

    if let Some(commit) = parse_commit(reference) {
        return RefType::new(RefKind::Commit, commit);
    }

    RefType::new(RefKind::Branch, reference)
}

pub struct RefResolver {
    api: Arc<dyn GitHubApi>,
}

impl RefResolver {
    pub fn new(api: Arc<dyn GitHubApi>) -> Self {
        Self { api }
    }

    pub fn resolve_ref_type(&self, reference: &str) -> RefType {
        resolve_ref_type(reference)
    }

    /// Resolve a reference to a commit, or `None` if no strategy finds one
    pub async fn resolve(&self, owner: &str, repo: &str, reference: &str) -> Option<ResolvedRef> {
        if reference.is_empty() {
            return None;
        }

        if let Some(sha) = self.resolve_tag(owner, repo, reference).await {
            return Some(ResolvedRef::new(reference, sha));
        }

        if let Some(sha) = self.resolve_pull(owner, repo, reference).await {
            return Some(ResolvedRef::new(reference, sha));
        }

        if let Some(sha) = self.resolve_commit(owner, repo, reference).await {
            return Some(ResolvedRef::new(COMMIT_LABEL, sha));
        }

        if let Some(sha) = self.resolve_branch(owner, repo, reference).await {
            return Some(ResolvedRef::new(reference, sha));
        }

        debug!("Could not resolve {} in {}/{}", reference, owner, repo);
        None
    }

    async fn resolve_tag(&self, owner: &str, repo: &str, reference: &str) -> Option<String> {
        let tag = parse_tag(reference)?;
        let result = self
            .api
            .show_reference(owner, repo, RefNamespace::Tags, tag)
            .await
            .map(|r| r.object.sha);
        soft_fail("tag", reference, result)
    }

    async fn resolve_pull(&self, owner: &str, repo: &str, reference: &str) -> Option<String> {
        let number = parse_pull(reference)?.parse::<u64>().ok()?;
        let result = self
            .api
            .show_pull_request(owner, repo, number)
            .await
            .map(|pr| pr.head.sha);
        soft_fail("pull request", reference, result)
    }

    async fn resolve_commit(&self, owner: &str, repo: &str, reference: &str) -> Option<String> {
        let commit = parse_commit(reference)?;
        let result = self
            .api
            .show_commit(owner, repo, commit)
            .await
            .map(|c| c.sha);
        soft_fail("commit", reference, result)
    }

    async fn resolve_branch(&self, owner: &str, repo: &str, branch: &str) -> Option<String> {
        let result = self
            .api
            .show_reference(owner, repo, RefNamespace::Heads, branch)
            .await
            .map(|r| r.object.sha);
        soft_fail("branch", branch, result)
    }
}

/// Remote failures become "no result" so the next strategy can run.
fn soft_fail(strategy: &str, reference: &str, result: Result<String, ApiError>) -> Option<String> {
    match result {
        Ok(sha) if !sha.is_empty() => Some(sha),
        Ok(_) => None,
        Err(e) if e.is_not_found() => {
            debug!("No {} found for {}", strategy, reference);
            None
        }
        Err(e) => {
            warn!("Failed to resolve {} {}: {}", strategy, reference, e);
            None
        }
    }
}
