//! Common types shared by adapters, clients and the resolver

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Type of version control provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderType {
    /// GitHub.com
    #[serde(rename = "github", alias = "gh")]
    GitHub,
    /// Self-hosted GitHub Enterprise
    #[serde(rename = "github_enterprise", alias = "ghe")]
    GitHubEnterprise,
}

impl ProviderType {
    /// Returns the string representation of the provider type
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::GitHub => "github",
            ProviderType::GitHubEnterprise => "github_enterprise",
        }
    }

    /// Legacy short key, also used to scope cache entries
    pub fn short_key(&self) -> &'static str {
        match self {
            ProviderType::GitHub => "gh",
            ProviderType::GitHubEnterprise => "ghe",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" | "gh" => Ok(ProviderType::GitHub),
            "github_enterprise" | "ghe" => Ok(ProviderType::GitHubEnterprise),
            _ => Err(()),
        }
    }
}

/// A configured version control provider, as stored by the persistence layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
}

impl ProviderConfig {
    pub fn new(id: impl Into<String>, provider_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider_type: provider_type.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the first non-empty parameter among `keys`.
    pub fn parameter(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.parameters.get(*key))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }

    /// Parsed provider type, if the stored value names a known provider.
    pub fn parsed_type(&self) -> Option<ProviderType> {
        self.provider_type.parse().ok()
    }
}

/// Classification of a reference string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// `tag/<name>`
    Tag,
    /// `pull/<number>`
    PullRequest,
    /// 40 lowercase hex characters
    Commit,
    /// Anything else
    Branch,
}

impl RefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefKind::Tag => "tag",
            RefKind::PullRequest => "pull_request",
            RefKind::Commit => "commit",
            RefKind::Branch => "branch",
        }
    }
}

/// A classified reference: its kind and the value extracted from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefType {
    pub kind: RefKind,
    pub value: String,
}

impl RefType {
    pub fn new(kind: RefKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// A reference resolved to a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRef {
    /// The reference as given, or `commit` for commit references
    pub label: String,
    pub sha: String,
}

impl ResolvedRef {
    pub fn new(label: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sha: sha.into(),
        }
    }
}

/// Namespace of a git reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefNamespace {
    Heads,
    Tags,
}

impl RefNamespace {
    /// Path segment used by the git data API
    pub fn as_str(&self) -> &'static str {
        match self {
            RefNamespace::Heads => "heads",
            RefNamespace::Tags => "tags",
        }
    }

    /// Fully qualified prefix, e.g. `refs/heads/`
    pub fn prefix(&self) -> &'static str {
        match self {
            RefNamespace::Heads => "refs/heads/",
            RefNamespace::Tags => "refs/tags/",
        }
    }
}

/// Raw git reference as returned by the git data API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitReference {
    #[serde(rename = "ref")]
    pub reference: String,
    pub object: GitObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitObject {
    pub sha: String,
    #[serde(rename = "type", default)]
    pub object_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitCommit {
    pub sha: String,
}

/// A branch or tag with its short name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
    /// Short name with the `refs/heads/` or `refs/tags/` prefix stripped
    pub name: String,
    /// Fully qualified reference
    pub reference: String,
    pub sha: String,
}

impl GitRef {
    pub fn from_reference(namespace: RefNamespace, raw: GitReference) -> Self {
        let name = raw
            .reference
            .strip_prefix(namespace.prefix())
            .unwrap_or(&raw.reference)
            .to_string();
        Self {
            name,
            reference: raw.reference,
            sha: raw.object.sha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    Open,
    Closed,
    All,
}

impl PullRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullRequestState::Open => "open",
            PullRequestState::Closed => "closed",
            PullRequestState::All => "all",
        }
    }
}

/// Filter applied when listing pull requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestFilter {
    pub state: Option<PullRequestState>,
    /// `user:branch`
    pub head: Option<String>,
    pub base: Option<String>,
}

impl PullRequestFilter {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(state) = self.state {
            query.push(("state", state.as_str().to_string()));
        }
        if let Some(head) = &self.head {
            query.push(("head", head.clone()));
        }
        if let Some(base) = &self.base {
            query.push(("base", base.clone()));
        }
        query
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestBranch {
    #[serde(rename = "ref")]
    pub reference: String,
    pub sha: String,
    #[serde(default)]
    pub user: Option<Account>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<Account>,
    pub head: PullRequestBranch,
    pub base: PullRequestBranch,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_state() -> String {
    "open".to_string()
}

impl PullRequest {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

/// Extended repository metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
