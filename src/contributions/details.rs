use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::context::{Cancelled, Context};
use crate::error::ItemError;
use crate::github::rate_limit;
use crate::github::repo_url::parse_repo_url;
use crate::github::{GithubApi, Issue};
use crate::stats::{Contribution, PrTally};

/// Concurrent outbound requests per fan-out stage.
pub const WORKER_POOL_SIZE: usize = 5;

/// Merged PRs folded by `owner/repo`.
#[derive(Debug, Default)]
pub struct RepoAccumulator {
    repos: HashMap<String, Contribution>,
}

impl RepoAccumulator {
    pub fn record(&mut self, owner: &str, repo: &str, merged_at: DateTime<Utc>, tally: PrTally) {
        self.repos
            .entry(format!("{owner}/{repo}"))
            .and_modify(|c| c.fold(merged_at, tally))
            .or_insert_with(|| Contribution::seed(owner, repo, merged_at, tally));
    }

    pub fn into_contributions(self) -> Vec<Contribution> {
        self.repos.into_values().collect()
    }
}

#[derive(Debug, Default)]
pub(crate) struct DetailOutcome {
    pub(crate) contributions: Vec<Contribution>,
    pub(crate) errors: Vec<ItemError>,
    /// Detail lookups that were throttled and fell back to nominal counts.
    pub(crate) rate_limited: usize,
}

#[derive(Default)]
struct Shared {
    repos: RepoAccumulator,
    errors: Vec<ItemError>,
    rate_limited: usize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fold every merged issue into per-repository contributions.
///
/// With `include_loc` each PR's commit and line counts are fetched, five at a
/// time. Without it every PR counts as one commit and no request is made.
pub(crate) async fn fetch_pr_details(
    ctx: &Context,
    api: Arc<dyn GithubApi>,
    issues: Vec<Issue>,
    include_loc: bool,
) -> Result<DetailOutcome, Cancelled> {
    let shared = Arc::new(Mutex::new(Shared::default()));
    let semaphore = Arc::new(Semaphore::new(WORKER_POOL_SIZE));
    let mut handles = Vec::with_capacity(issues.len());

    for issue in issues {
        let Some(merged_at) = issue.merged_at() else {
            debug!(number = issue.number, "skipping unmerged search hit");
            continue;
        };

        let ctx = ctx.clone();
        let api = Arc::clone(&api);
        let semaphore = Arc::clone(&semaphore);
        let shared = Arc::clone(&shared);

        handles.push(tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only fails on cancellation.
            let _permit = ctx.run(semaphore.acquire_owned()).await?;

            let (owner, repo) = match parse_repo_url(&issue.repository_url) {
                Ok(parts) => parts,
                Err(e) => {
                    lock(&shared).errors.push(e.into());
                    return Ok(());
                }
            };

            let tally = if include_loc {
                match ctx.run(api.get_pull_request(&owner, &repo, issue.number)).await? {
                    Ok(resp) => PrTally {
                        commits: resp.data.commits,
                        additions: resp.data.additions,
                        deletions: resp.data.deletions,
                    },
                    Err(err) if rate_limit::is_rate_limited(err.meta()) => {
                        debug!(%owner, %repo, number = issue.number, "PR detail rate limited");
                        lock(&shared).rate_limited += 1;
                        PrTally::NOMINAL
                    }
                    Err(source) => {
                        lock(&shared).errors.push(ItemError::PullRequest {
                            owner: owner.clone(),
                            repo: repo.clone(),
                            number: issue.number,
                            source,
                        });
                        PrTally::NOMINAL
                    }
                }
            } else {
                PrTally::NOMINAL
            };

            lock(&shared).repos.record(&owner, &repo, merged_at, tally);
            Ok::<(), Cancelled>(())
        }));
    }

    let mut cancelled = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                let _ = cancelled.get_or_insert(reason);
            }
            Err(e) => {
                lock(&shared).errors.push(ItemError::Worker(e.to_string()));
            }
        }
    }
    if let Some(reason) = cancelled {
        return Err(reason);
    }

    let shared = std::mem::take(&mut *lock(&shared));
    Ok(DetailOutcome {
        contributions: shared.repos.into_contributions(),
        errors: shared.errors,
        rate_limited: shared.rate_limited,
    })
}
