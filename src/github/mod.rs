//! Boundary with the GitHub REST API.
//!
//! The pipeline only ever talks to a [`GithubApi`]; [`ApiClient`] is the real
//! reqwest-backed implementation and [`MockApiClient`] serves canned fixtures
//! for debug runs.

mod client;
mod mock;
pub mod rate_limit;
pub mod repo_url;
pub mod types;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use thiserror::Error;

pub use client::{ApiClient, GITHUB_API_BASE_URL};
pub use mock::MockApiClient;
pub use types::{Issue, PullRequest, PullRequestRef, Repository, SearchIssuesResponse};

/// Status and headers of a response, kept for the rate-limit governor.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseMeta {
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, headers }
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("GitHub API returned HTTP {}: {message}", .meta.status.as_u16())]
    Status { meta: ResponseMeta, message: String },

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("decoding response: {source}")]
    Decode {
        meta: Option<ResponseMeta>,
        #[source]
        source: serde_json::Error,
    },

    #[error("reading mock fixture {path}: {message}")]
    Fixture { path: String, message: String },
}

impl ApiError {
    /// Status and headers of the failed response, when one was received.
    pub fn meta(&self) -> Option<&ResponseMeta> {
        match self {
            Self::Status { meta, .. } => Some(meta),
            Self::Decode { meta, .. } => meta.as_ref(),
            Self::Transport(_) | Self::Fixture { .. } => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.meta().map(|m| m.status)
    }
}

/// The three REST calls the contribution pipeline needs.
#[async_trait]
pub trait GithubApi: Send + Sync {
    async fn search_issues(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<SearchIssuesResponse>, ApiError>;

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ApiResponse<PullRequest>, ApiError>;

    async fn get_repository(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ApiResponse<Repository>, ApiError>;
}
