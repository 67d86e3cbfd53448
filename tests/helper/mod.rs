//! Shared fixtures for the integration tests

#![allow(dead_code)]

pub mod github;

use std::sync::Arc;

use tempfile::TempDir;

use hal_vcs::cache::{MemoryCache, NamespacedCache, ResultCache, SqliteCache};
use hal_vcs::vcs::VcsFactory;
use hal_vcs::vcs::adapters::{GitHubAdapter, GitHubEnterpriseAdapter};
use hal_vcs::vcs::types::ProviderConfig;

pub use github::{GitHubServer, SHA, SHA_2};

/// Creates a namespaced in-memory cache
pub fn create_memory_cache() -> Arc<dyn ResultCache> {
    Arc::new(NamespacedCache::new(Arc::new(MemoryCache::new()), "test"))
}

/// Creates a SQLite cache in a temp dir; keep the dir alive for the test
pub fn create_sqlite_cache() -> (TempDir, Arc<SqliteCache>) {
    let temp_dir = TempDir::new().unwrap();
    let cache = SqliteCache::new(&temp_dir.path().join("cache.db")).unwrap();
    (temp_dir, Arc::new(cache))
}

/// Factory whose public GitHub adapter talks to `api_url`
pub fn create_factory(api_url: &str, cache: Arc<dyn ResultCache>) -> VcsFactory {
    VcsFactory::new()
        .with_adapter(Arc::new(
            GitHubAdapter::new(cache.clone()).with_api_url(api_url),
        ))
        .with_adapter(Arc::new(GitHubEnterpriseAdapter::new(cache)))
}

pub fn github_config(id: &str, token: &str) -> ProviderConfig {
    ProviderConfig::new(id, "github")
        .with_name("GitHub")
        .with_parameter("gh.token", token)
}

pub fn enterprise_config(id: &str, url: &str, token: &str) -> ProviderConfig {
    ProviderConfig::new(id, "github_enterprise")
        .with_name("GitHub Enterprise")
        .with_parameter("ghe.url", url)
        .with_parameter("ghe.token", token)
}
