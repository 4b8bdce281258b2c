//! Scripted in-memory backend shared by the pipeline unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use tokio::time::Instant;

use crate::github::{
    ApiError, ApiResponse, GithubApi, Issue, PullRequest, PullRequestRef, Repository, ResponseMeta,
    SearchIssuesResponse,
};

/// An HTTP failure to replay.
#[derive(Debug, Clone)]
pub(crate) struct Failure {
    status: u16,
    headers: Vec<(&'static str, String)>,
}

impl Failure {
    pub(crate) fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// 403 with an exhausted quota that resets at `reset` (unix seconds).
    pub(crate) fn rate_limited(reset: i64) -> Self {
        Self::status(403)
            .header("x-ratelimit-remaining", "0")
            .header("x-ratelimit-reset", &reset.to_string())
    }

    pub(crate) fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    fn into_error(self) -> ApiError {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let _ = headers.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        ApiError::Status {
            meta: ResponseMeta::new(StatusCode::from_u16(self.status).unwrap(), headers),
            message: "scripted failure".into(),
        }
    }
}

pub(crate) type Scripted<T> = Result<T, Failure>;

#[derive(Default)]
pub(crate) struct FakeApi {
    /// Page `n` is served from index `n - 1`; later pages are empty.
    pub(crate) search_pages: Vec<Scripted<Vec<Issue>>>,
    /// Keyed by `owner/repo` and PR number. Missing entries answer 404.
    pub(crate) pull_requests: HashMap<(String, u64), Scripted<PullRequest>>,
    /// Keyed by `owner/repo`. Missing entries answer 404.
    pub(crate) repositories: HashMap<String, Scripted<Repository>>,
    /// Simulated network time for detail and metadata calls.
    pub(crate) latency: Duration,

    pub(crate) search_log: Mutex<Vec<(u32, Instant)>>,
    pub(crate) queries: Mutex<Vec<String>>,
    pub(crate) pr_calls: AtomicUsize,
    pub(crate) repo_calls: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
    pub(crate) in_flight: AtomicUsize,
}

impl FakeApi {
    async fn simulate_latency(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let _ = self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn searched_pages(&self) -> Vec<u32> {
        self.search_log.lock().unwrap().iter().map(|(p, _)| *p).collect()
    }
}

fn ok<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        data,
        meta: ResponseMeta::new(StatusCode::OK, HeaderMap::new()),
    }
}

#[async_trait]
impl GithubApi for FakeApi {
    async fn search_issues(
        &self,
        query: &str,
        page: u32,
        _per_page: u32,
    ) -> Result<ApiResponse<SearchIssuesResponse>, ApiError> {
        self.search_log.lock().unwrap().push((page, Instant::now()));
        self.queries.lock().unwrap().push(query.to_string());

        let items = match self.search_pages.get(page as usize - 1) {
            Some(Ok(items)) => items.clone(),
            Some(Err(failure)) => return Err(failure.clone().into_error()),
            None => Vec::new(),
        };
        Ok(ok(SearchIssuesResponse {
            total_count: items.len() as u64,
            incomplete_results: false,
            items,
        }))
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ApiResponse<PullRequest>, ApiError> {
        let _ = self.pr_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        match self.pull_requests.get(&(format!("{owner}/{repo}"), number)) {
            Some(Ok(pr)) => Ok(ok(pr.clone())),
            Some(Err(failure)) => Err(failure.clone().into_error()),
            None => Err(Failure::status(404).into_error()),
        }
    }

    async fn get_repository(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ApiResponse<Repository>, ApiError> {
        let _ = self.repo_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        match self.repositories.get(&format!("{owner}/{repo}")) {
            Some(Ok(r)) => Ok(ok(r.clone())),
            Some(Err(failure)) => Err(failure.clone().into_error()),
            None => Err(Failure::status(404).into_error()),
        }
    }
}

pub(crate) fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()
}

/// A merged PR search hit in `slug` (`owner/repo`).
pub(crate) fn merged(slug: &str, number: u64, merged_at: DateTime<Utc>) -> Issue {
    Issue {
        number,
        title: format!("PR #{number}"),
        state: "closed".into(),
        repository_url: format!("https://api.github.com/repos/{slug}"),
        html_url: format!("https://github.com/{slug}/pull/{number}"),
        pull_request: Some(PullRequestRef {
            url: format!("https://api.github.com/repos/{slug}/pulls/{number}"),
            html_url: format!("https://github.com/{slug}/pull/{number}"),
            merged_at: Some(merged_at),
        }),
    }
}

/// `n` merged hits in `slug`, numbered from `first`.
pub(crate) fn merged_page(slug: &str, first: u64, n: usize) -> Vec<Issue> {
    (0..n as u64)
        .map(|i| merged(slug, first + i, day(1 + (i % 28) as u32)))
        .collect()
}

pub(crate) fn pull(number: u64, commits: u64, additions: u64, deletions: u64) -> PullRequest {
    PullRequest {
        number,
        merged: true,
        merged_at: Some(day(1)),
        commits,
        additions,
        deletions,
        changed_files: 1,
    }
}

pub(crate) fn repository(slug: &str, stars: u64) -> Repository {
    let name = slug.rsplit('/').next().unwrap_or(slug);
    Repository {
        name: name.to_string(),
        full_name: slug.to_string(),
        description: Some(format!("{name} description")),
        html_url: format!("https://github.com/{slug}"),
        stargazers_count: stars,
    }
}
