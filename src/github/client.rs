use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::rate_limit::{self, RateLimitInfo};
use super::{
    ApiError, ApiResponse, GithubApi, PullRequest, Repository, ResponseMeta, SearchIssuesResponse,
};
use crate::context::Context;

pub const GITHUB_API_BASE_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
/// Remaining calls at which a warning is logged.
const LOW_QUOTA_THRESHOLD: u64 = 10;

/// REST client for api.github.com (or a compatible base URL).
#[derive(Clone)]
pub struct ApiClient {
    token: Option<Arc<String>>,
    http: Client,
    base_url: String,
}

impl core::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiClient")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiClient {
    pub fn new(token: Option<&str>, base_url: impl Into<String>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        let _ = headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        let _ = headers.insert(USER_AGENT, HeaderValue::from_static("gh-oss-stats"));

        let http = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            token: token
                .filter(|t| !t.is_empty())
                .map(|t| Arc::new(t.to_string())),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the JSON body.
    ///
    /// Transient server errors (500/502/503/504) are retried after the
    /// governor's wait until it reports its attempt ceiling. Throttling
    /// responses are handed straight back; whether to wait for them is the
    /// pipeline's call.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 0u32;

        loop {
            let mut req = self.http.get(&url).query(query);
            if let Some(token) = &self.token {
                req = req.bearer_auth(token.as_str());
            }

            let resp = req.send().await?;
            let meta = ResponseMeta::new(resp.status(), resp.headers().clone());
            let body = resp.bytes().await?;

            if meta.status.is_success() {
                let quota = RateLimitInfo::from_headers(&meta.headers);
                if rate_limit::is_below_threshold(quota.as_ref(), LOW_QUOTA_THRESHOLD) {
                    warn!(
                        remaining = quota.map(|q| q.remaining),
                        reset = %rate_limit::reset_time_display(quota.as_ref()),
                        "GitHub API quota running low"
                    );
                }
                return serde_json::from_slice(&body)
                    .map(|data| ApiResponse {
                        data,
                        meta: meta.clone(),
                    })
                    .map_err(|source| ApiError::Decode {
                        meta: Some(meta),
                        source,
                    });
            }

            let transient =
                rate_limit::should_retry(Some(&meta)) && meta.status.is_server_error();
            if transient {
                debug!(%url, status = meta.status.as_u16(), attempt, "server error, retrying");
                // Callers bound the whole request with their own `Context::run`.
                match rate_limit::handle_rate_limit(&Context::background(), Some(&meta), attempt)
                    .await
                {
                    Ok(()) => {
                        attempt += 1;
                        continue;
                    }
                    Err(err) => warn!(%url, %err, "giving up on server error"),
                }
            }

            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());

            return Err(ApiError::Status { meta, message });
        }
    }
}

#[async_trait]
impl GithubApi for ApiClient {
    async fn search_issues(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ApiResponse<SearchIssuesResponse>, ApiError> {
        debug!(query, page, per_page, "searching issues");
        self.get_json(
            "/search/issues",
            &[
                ("q", query.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
        )
        .await
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ApiResponse<PullRequest>, ApiError> {
        self.get_json(&format!("/repos/{owner}/{repo}/pulls/{number}"), &[])
            .await
    }

    async fn get_repository(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ApiResponse<Repository>, ApiError> {
        self.get_json(&format!("/repos/{owner}/{repo}"), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_is_ignored() {
        let client = ApiClient::new(Some(""), GITHUB_API_BASE_URL).unwrap();
        assert!(client.token.is_none());

        let client = ApiClient::new(Some("ghp_x"), "http://localhost:9999/").unwrap();
        assert_eq!(client.token.as_deref().map(String::as_str), Some("ghp_x"));
        assert_eq!(client.base_url(), "http://localhost:9999");
    }
}
