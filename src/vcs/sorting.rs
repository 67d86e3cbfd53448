//! Ordering for branch, tag and pull request listings

use std::cmp::Ordering;

use crate::vcs::semver::parse_tag_version;
use crate::vcs::types::{GitRef, PullRequest};

/// Branches listed ahead of everything else, in this order
const PRIORITY_BRANCHES: &[&str] = &["master", "main"];

/// `master`/`main` first, then case-insensitive alphabetical
pub fn compare_branches(a: &GitRef, b: &GitRef) -> Ordering {
    let rank = |name: &str| {
        PRIORITY_BRANCHES
            .iter()
            .position(|p| *p == name)
            .unwrap_or(PRIORITY_BRANCHES.len())
    };

    rank(&a.name)
        .cmp(&rank(&b.name))
        .then_with(|| compare_case_insensitive(&a.name, &b.name))
}

/// Newest semantic version first; non-version tags after, alphabetical
pub fn compare_tags(a: &GitRef, b: &GitRef) -> Ordering {
    match (parse_tag_version(&a.name), parse_tag_version(&b.name)) {
        (Some(va), Some(vb)) => vb
            .cmp(&va)
            .then_with(|| compare_case_insensitive(&a.name, &b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => compare_case_insensitive(&a.name, &b.name),
    }
}

/// Open before closed, then most recently updated, then highest number
pub fn compare_pull_requests(a: &PullRequest, b: &PullRequest) -> Ordering {
    b.is_open()
        .cmp(&a.is_open())
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| b.number.cmp(&a.number))
}

fn compare_case_insensitive(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
