use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::rate_limit::RATE_LIMIT_REMAINING_HEADER;
use super::{
    ApiError, ApiResponse, GithubApi, PullRequest, Repository, ResponseMeta, SearchIssuesResponse,
};

const SEARCH_FIXTURE: &str = "searchForMergedPrs.json";
const PULL_REQUEST_FIXTURE: &str = "pullRequest.json";
const REPOSITORY_FIXTURE: &str = "repository.json";

/// Serves canned JSON from a fixture directory instead of calling GitHub.
#[derive(Debug, Clone)]
pub struct MockApiClient {
    dir: PathBuf,
}

impl MockApiClient {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<ApiResponse<T>, ApiError> {
        let path = self.dir.join(name);
        debug!(path = %path.display(), "serving mock fixture");

        let fixture_err = |message: String| ApiError::Fixture {
            path: path.display().to_string(),
            message,
        };
        let raw = std::fs::read(&path).map_err(|e| fixture_err(e.to_string()))?;
        let data = serde_json::from_slice(&raw).map_err(|e| fixture_err(e.to_string()))?;

        Ok(ApiResponse {
            data,
            meta: ok_meta(),
        })
    }
}

fn ok_meta() -> ResponseMeta {
    let mut headers = HeaderMap::new();
    let _ = headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from_static("5000"));
    let _ = headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
    ResponseMeta::new(StatusCode::OK, headers)
}

#[async_trait]
impl GithubApi for MockApiClient {
    async fn search_issues(
        &self,
        _query: &str,
        page: u32,
        _per_page: u32,
    ) -> Result<ApiResponse<SearchIssuesResponse>, ApiError> {
        let mut resp: ApiResponse<SearchIssuesResponse> = self.read(SEARCH_FIXTURE)?;
        // One page of fixtures; anything past it is an empty page so pagination ends.
        if page > 1 {
            resp.data.items.clear();
        }
        Ok(resp)
    }

    async fn get_pull_request(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<ApiResponse<PullRequest>, ApiError> {
        self.read(PULL_REQUEST_FIXTURE)
    }

    async fn get_repository(
        &self,
        _owner: &str,
        _repo: &str,
    ) -> Result<ApiResponse<Repository>, ApiError> {
        self.read(REPOSITORY_FIXTURE)
    }
}
