use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CacheError, MemoryCache, NamespacedCache, NoopCache, ResultCache, SqliteCache};
use crate::vcs::adapters::{GitHubAdapter, GitHubEnterpriseAdapter};
use crate::vcs::downloader::DownloaderOptions;
use crate::vcs::factory::VcsFactory;
use crate::vcs::github::http::{DEFAULT_API_URL, USER_AGENT};

// =============================================================================
// Time-related constants
// =============================================================================

/// Timeout for API requests in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// How long a resolved reference stays cached
pub const REF_CACHE_TTL_SECS: u64 = 30;

/// How long repository and reference URLs stay cached
pub const URL_CACHE_TTL_SECS: u64 = 30;

/// How long an adapter reuses a built client
pub const CLIENT_CACHE_TTL_SECS: u64 = 60;

/// Downloader connect timeout
pub const DOWNLOAD_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Downloader total timeout
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

pub const MAX_REDIRECTS: usize = 10;

/// Most entries the in-memory cache holds at once
pub const MEMORY_CACHE_CAPACITY: usize = 10_000;

/// Cache namespace used when none is configured
pub const DEFAULT_CACHE_NAMESPACE: &str = "hal";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to open cache: {0}")]
    Cache(#[from] CacheError),
}

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct VcsConfig {
    pub cache: CacheConfig,
    pub github: GitHubConfig,
    pub http: HttpConfig,
}

impl VcsConfig {
    /// Reads a JSON config file; missing fields fall back to defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Sqlite,
    None,
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Prefix for every cache key; empty disables namespacing
    pub namespace: String,
    /// SQLite file, defaults to [`db_path`]
    pub path: Option<PathBuf>,
    /// Entry limit for the memory backend
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
            path: None,
            capacity: MEMORY_CACHE_CAPACITY,
        }
    }
}

/// Public GitHub settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GitHubConfig {
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// Downloader transport settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DOWNLOAD_CONNECT_TIMEOUT_SECS,
            timeout_secs: DOWNLOAD_TIMEOUT_SECS,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn downloader_options(&self) -> DownloaderOptions {
        DownloaderOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
            ..DownloaderOptions::default()
        }
    }
}

/// Opens the configured cache backend
pub fn build_cache(config: &CacheConfig) -> Result<Arc<dyn ResultCache>, ConfigError> {
    let backing: Arc<dyn ResultCache> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCache::with_capacity(config.capacity)),
        CacheBackend::None => Arc::new(NoopCache),
        CacheBackend::Sqlite => {
            let path = config.path.clone().unwrap_or_else(db_path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            Arc::new(SqliteCache::new(&path)?)
        }
    };

    if config.namespace.is_empty() {
        Ok(backing)
    } else {
        Ok(Arc::new(NamespacedCache::new(backing, &config.namespace)))
    }
}

/// Wires the cache and both GitHub adapters into a factory
pub fn build_factory(config: &VcsConfig) -> Result<VcsFactory, ConfigError> {
    let cache = build_cache(&config.cache)?;
    let options = config.http.downloader_options();

    let github = GitHubAdapter::new(cache.clone())
        .with_api_url(&config.github.api_url)
        .with_downloader_options(options.clone());
    let enterprise = GitHubEnterpriseAdapter::new(cache).with_downloader_options(options);

    Ok(VcsFactory::new()
        .with_adapter(Arc::new(github))
        .with_adapter(Arc::new(enterprise)))
}

/// Returns the path to the data directory for hal-vcs.
/// Uses $XDG_DATA_HOME/hal-vcs if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/hal-vcs,
/// or ./hal-vcs if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the cache database file.
pub fn db_path() -> PathBuf {
    data_dir().join("cache.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("hal-vcs.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("hal-vcs")
}
