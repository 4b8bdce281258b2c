//! Error taxonomy for a contribution run.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::config::ConfigError;
use crate::context::Cancelled;
use crate::github::ApiError;
use crate::github::repo_url::RepoUrlError;
use crate::stats::Stats;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The search quota is spent. Retry the whole run after `reset_at`.
    #[error("{}", rate_limited_message(.message, .reset_at))]
    RateLimited {
        reset_at: DateTime<Utc>,
        message: String,
    },

    #[error("{}", authentication_message(.message))]
    Authentication { message: String },

    #[error("user not found: {username}")]
    NotFound { username: String },

    /// The run completed, but some per-item lookups failed.
    #[error(transparent)]
    PartialResults(Box<PartialResults>),

    #[error("searching issues: {0}")]
    Search(#[source] ApiError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("creating GitHub client: {0}")]
    Client(#[source] ApiError),
}

fn rate_limited_message(message: &str, reset_at: &DateTime<Utc>) -> String {
    let reset = reset_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    if message.is_empty() {
        format!("rate limit exceeded, resets at {reset}")
    } else {
        format!("rate limit exceeded: {message} (resets at {reset})")
    }
}

fn authentication_message(message: &str) -> String {
    if message.is_empty() {
        "authentication failed".to_string()
    } else {
        format!("authentication failed: {message}")
    }
}

impl Error {
    /// Usable stats, for successful-but-degraded runs.
    pub fn partial_stats(&self) -> Option<&Stats> {
        match self {
            Self::PartialResults(partial) => Some(&partial.stats),
            _ => None,
        }
    }
}

/// A completed run that is missing some detail.
#[derive(Debug, Error)]
#[error("{}", partial_message(.message, .errors.len()))]
pub struct PartialResults {
    pub stats: Stats,
    pub errors: Vec<ItemError>,
    pub message: String,
}

fn partial_message(message: &str, error_count: usize) -> String {
    if message.is_empty() {
        format!("partial results ({error_count} errors)")
    } else {
        format!("partial results: {message} ({error_count} errors)")
    }
}

/// A per-item failure absorbed by the detail fetch stage.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("parsing repo URL: {0}")]
    RepoUrl(#[from] RepoUrlError),

    #[error("fetching PR {owner}/{repo}#{number}: {source}")]
    PullRequest {
        owner: String,
        repo: String,
        number: u64,
        #[source]
        source: ApiError,
    },

    #[error("detail worker failed: {0}")]
    Worker(String),
}
