//! Version control providers
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐     ┌────────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ VcsFactory │────▶│   VcsAdapter   │────▶│ GitHubClient │────▶│ RefResolver │
//! │ (dispatch) │     │ (validate/pool)│     │ (cache/sort) │     │ (strategies)│
//! └────────────┘     └────────────────┘     └──────────────┘     └─────────────┘
//!                                                  │                    │
//!                                                  ▼                    ▼
//!                                           ┌──────────────────────────────┐
//!                                           │     GitHubApi (REST v3)      │
//!                                           └──────────────────────────────┘
//! ```

pub mod adapter;
pub mod adapters;
pub mod api;
pub mod client;
pub mod client_pool;
pub mod downloader;
pub mod error;
pub mod errors;
pub mod factory;
pub mod github;
pub mod resolver;
pub mod semver;
pub mod sorting;
pub mod types;

pub use adapter::VcsAdapter;
pub use client::VcsClient;
pub use downloader::Downloader;
pub use errors::ErrorList;
pub use factory::VcsFactory;
