use chrono::{TimeDelta, Utc};
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::github::rate_limit::{self, RateLimitInfo};
use crate::github::{ApiError, GithubApi, Issue};

pub const PER_PAGE: u32 = 100;

const SEARCH_RATE_LIMITED: &str = "search API rate limit exceeded";
const INVALID_TOKEN: &str = "invalid or missing token";

/// Merged PRs by `username` outside their own repositories and `excluded_orgs`.
pub fn build_query<'a>(
    username: &str,
    excluded_orgs: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut query = format!("author:{username} type:pr is:merged -user:{username}");
    let orgs = excluded_orgs.into_iter().map(str::trim);
    for org in orgs.filter(|o| !o.is_empty()) {
        query.push_str(" -org:");
        query.push_str(org);
    }
    query
}

/// Walk search pages in order until a short page or `max_prs` hits.
///
/// Failures are classified here and never retried.
pub(crate) async fn search_merged_prs(
    ctx: &Context,
    api: &dyn GithubApi,
    username: &str,
    query: &str,
    max_prs: usize,
) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();
    let mut page = 1u32;

    loop {
        if page > 1 {
            rate_limit::wait_for_search_api(ctx).await?;
        }

        let resp = ctx
            .run(api.search_issues(query, page, PER_PAGE))
            .await?
            .map_err(|e| classify(e, username))?;

        let fetched = resp.data.items.len();
        debug!(page, fetched, total = resp.data.total_count, "search page");
        issues.extend(resp.data.items);

        if issues.len() >= max_prs {
            issues.truncate(max_prs);
            info!(max_prs, "reached max PRs limit");
            break;
        }
        if fetched < PER_PAGE as usize {
            break;
        }
        page += 1;
    }

    Ok(issues)
}

fn classify(err: ApiError, username: &str) -> Error {
    let meta = err.meta();
    if rate_limit::is_rate_limited(meta) {
        let reset_at = meta
            .and_then(|m| RateLimitInfo::from_headers(&m.headers))
            .map_or_else(|| Utc::now() + TimeDelta::minutes(1), |info| info.reset_at);
        return Error::RateLimited {
            reset_at,
            message: SEARCH_RATE_LIMITED.to_string(),
        };
    }

    match err.status() {
        Some(StatusCode::UNAUTHORIZED) => Error::Authentication {
            message: INVALID_TOKEN.to_string(),
        },
        Some(StatusCode::NOT_FOUND) => Error::NotFound {
            username: username.to_string(),
        },
        _ => Error::Search(err),
    }
}
