//! GitHub implementation of the client surface
//!
//! - [`http`]: REST v3 transport implementing [`GitHubApi`](crate::vcs::api::GitHubApi)
//! - [`client`]: caching, sorting client built on top of it

pub mod client;
pub mod http;

pub use client::GitHubClient;
pub use http::HttpGitHubApi;
