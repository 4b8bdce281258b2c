use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::details::WORKER_POOL_SIZE;
use crate::context::{Cancelled, Context};
use crate::github::GithubApi;
use crate::stats::Contribution;

/// Fill in description, URL and stars for every contribution.
///
/// Each task owns one index. A failed lookup is logged and leaves that entry's
/// metadata empty.
pub(crate) async fn enrich_with_repo_data(
    ctx: &Context,
    api: Arc<dyn GithubApi>,
    contributions: &mut [Contribution],
) -> Result<(), Cancelled> {
    let semaphore = Arc::new(Semaphore::new(WORKER_POOL_SIZE));
    let mut handles = Vec::with_capacity(contributions.len());

    for (idx, contribution) in contributions.iter().enumerate() {
        let ctx = ctx.clone();
        let api = Arc::clone(&api);
        let semaphore = Arc::clone(&semaphore);
        let owner = contribution.owner.clone();
        let repo = contribution.repo_name.clone();

        handles.push(tokio::spawn(async move {
            let _permit = ctx.run(semaphore.acquire_owned()).await?;
            let result = ctx.run(api.get_repository(&owner, &repo)).await?;
            Ok::<_, Cancelled>((idx, result))
        }));
    }

    let mut cancelled = None;
    for handle in handles {
        match handle.await {
            Ok(Ok((idx, Ok(resp)))) => {
                let repo = resp.data;
                let target = &mut contributions[idx];
                target.description = repo.description.unwrap_or_default();
                target.repo_url = repo.html_url;
                target.stars = repo.stargazers_count;
            }
            Ok(Ok((idx, Err(e)))) => {
                warn!(repo = %contributions[idx].repo, error = %e, "failed to fetch repository metadata");
            }
            Ok(Err(reason)) => {
                let _ = cancelled.get_or_insert(reason);
            }
            Err(e) => warn!(error = %e, "metadata worker failed"),
        }
    }

    match cancelled {
        Some(reason) => Err(reason),
        None => {
            debug!(count = contributions.len(), "repository metadata fetched");
            Ok(())
        }
    }
}
