//! The contribution pipeline: search, detail fetch, enrichment, aggregation.

mod aggregate;
mod details;
mod enrich;
mod search;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, PartialResults, Result};
use crate::github::{ApiClient, GithubApi, MockApiClient};
use crate::stats::Stats;

pub use aggregate::{build_stats, filter_min_stars, sort_by_first_contribution_desc};
pub use details::{RepoAccumulator, WORKER_POOL_SIZE};
pub use search::{PER_PAGE, build_query};

/// Runs contribution lookups against one GitHub backend.
#[derive(Clone)]
pub struct Client {
    config: Config,
    api: Arc<dyn GithubApi>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Validate `config` and pick the backend: fixtures when `debug` is set,
    /// the REST API otherwise.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let api: Arc<dyn GithubApi> = if config.debug {
            info!(dir = %config.mock_data_dir.display(), "debug mode: serving mock responses");
            Arc::new(MockApiClient::new(config.mock_data_dir.clone()))
        } else {
            Arc::new(
                ApiClient::new(config.token.as_deref(), config.api_base_url.clone())
                    .map_err(Error::Client)?,
            )
        };

        Ok(Self { config, api })
    }

    /// Use a caller-supplied backend.
    pub fn with_api(config: Config, api: Arc<dyn GithubApi>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, api })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Aggregate `username`'s merged PRs to repositories they do not own.
    ///
    /// The configured timeout bounds the whole call. Per-item failures do not
    /// abort the run; they come back as [`Error::PartialResults`] carrying the
    /// stats that were collected.
    pub async fn get_contributions(&self, ctx: &Context, username: &str) -> Result<Stats> {
        let ctx = ctx.with_timeout(self.config.timeout);
        info!(username, "fetching contributions");

        let query = build_query(username, self.config.excluded_orgs());
        let issues = search::search_merged_prs(
            &ctx,
            self.api.as_ref(),
            username,
            &query,
            self.config.max_prs,
        )
        .await?;

        if issues.is_empty() {
            info!(username, "no contributions found");
            return Ok(Stats::empty(username));
        }
        info!(count = issues.len(), "found merged PRs");

        let details = details::fetch_pr_details(
            &ctx,
            Arc::clone(&self.api),
            issues,
            self.config.include_loc,
        )
        .await?;
        if details.rate_limited > 0 {
            warn!(
                dropped = details.rate_limited,
                "rate limited PR detail lookups counted with default figures"
            );
        }

        let mut contributions = details.contributions;
        info!(repos = contributions.len(), "fetching repository metadata");
        enrich::enrich_with_repo_data(&ctx, Arc::clone(&self.api), &mut contributions).await?;

        let stats = build_stats(username, contributions, self.config.min_stars);

        if !details.errors.is_empty() {
            warn!(errors = details.errors.len(), "completed with errors");
            let mut message = format!(
                "collected {} contributions with errors",
                stats.contributions.len()
            );
            if details.rate_limited > 0 {
                message.push_str(&format!(
                    "; {} PR detail lookups were rate limited",
                    details.rate_limited
                ));
            }
            return Err(Error::PartialResults(Box::new(PartialResults {
                stats,
                errors: details.errors,
                message,
            })));
        }

        info!(
            projects = stats.summary.total_projects,
            prs = stats.summary.total_prs_merged,
            "fetched contributions"
        );
        Ok(stats)
    }
}
