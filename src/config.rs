//! Run configuration.
//!
//! Built once (by the CLI or a library caller) and handed to
//! [`crate::Client::new`]; nothing reads process-wide state after that.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::github::GITHUB_API_BASE_URL;

pub const DEFAULT_MAX_PRS: usize = 500;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MOCK_DATA_DIR: &str = "fixtures";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Personal access token; unauthenticated runs get 60 requests/hour.
    pub token: Option<String>,
    /// Fetch per-PR commit and line counts (one extra request per PR).
    pub include_loc: bool,
    /// Drop repositories with fewer stars. Zero keeps everything.
    pub min_stars: u64,
    /// Stop collecting search hits after this many.
    pub max_prs: usize,
    /// Budget for the whole run, every remote call included.
    pub timeout: Duration,
    pub exclude_orgs: Vec<String>,
    /// Serve canned responses from `mock_data_dir` instead of calling GitHub.
    pub debug: bool,
    pub mock_data_dir: PathBuf,
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            include_loc: false,
            min_stars: 0,
            max_prs: DEFAULT_MAX_PRS,
            timeout: DEFAULT_TIMEOUT,
            exclude_orgs: Vec::new(),
            debug: false,
            mock_data_dir: PathBuf::from(DEFAULT_MOCK_DATA_DIR),
            api_base_url: GITHUB_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max PRs must be > 0")]
    ZeroMaxPrs,

    #[error("timeout must be > 0")]
    ZeroTimeout,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_prs == 0 {
            return Err(ConfigError::ZeroMaxPrs);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Excluded organisations, trimmed, blanks dropped.
    pub fn excluded_orgs(&self) -> impl Iterator<Item = &str> {
        self.exclude_orgs
            .iter()
            .map(|org| org.trim())
            .filter(|org| !org.is_empty())
    }

    /// Parse a comma separated organisation list.
    pub fn parse_org_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|org| !org.is_empty())
            .map(str::to_string)
            .collect()
    }
}
