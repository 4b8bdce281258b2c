//! Response shapes for the three REST endpoints the pipeline consumes.
//!
//! Only the fields we read are modelled; everything else GitHub sends is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchIssuesResponse {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<Issue>,
}

/// One search hit. Pull requests carry a [`PullRequestRef`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub repository_url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub pull_request: Option<PullRequestRef>,
}

impl Issue {
    /// Merge instant, when this hit is a merged pull request.
    pub fn merged_at(&self) -> Option<DateTime<Utc>> {
        self.pull_request.as_ref().and_then(|pr| pr.merged_at)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PullRequestRef {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub merged: bool,
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub commits: u64,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changed_files: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Repository {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_with_merged_pr() {
        let json = r#"{
            "total_count": 42,
            "incomplete_results": false,
            "items": [{
                "number": 123,
                "title": "Fix parser",
                "state": "closed",
                "repository_url": "https://api.github.com/repos/owner/repo",
                "html_url": "https://github.com/owner/repo/pull/123",
                "user": { "login": "someone", "id": 1 },
                "pull_request": {
                    "url": "https://api.github.com/repos/owner/repo/pulls/123",
                    "html_url": "https://github.com/owner/repo/pull/123",
                    "merged_at": "2023-01-03T00:00:00Z"
                }
            }]
        }"#;

        let resp: SearchIssuesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.total_count, 42);
        assert_eq!(resp.items.len(), 1);

        let merged = resp.items[0].merged_at().unwrap();
        assert_eq!(merged.to_rfc3339(), "2023-01-03T00:00:00+00:00");
    }

    #[test]
    fn plain_issue_has_no_merge_time() {
        let json = r#"{
            "number": 7,
            "repository_url": "https://api.github.com/repos/owner/repo",
            "pull_request": { "merged_at": null }
        }"#;

        let issue: Issue = serde_json::from_str(json).unwrap();
        assert!(issue.pull_request.is_some());
        assert!(issue.merged_at().is_none());
    }

    #[test]
    fn hit_without_repository_url_still_decodes() {
        let json = r#"{
            "total_count": 2,
            "items": [
                { "number": 1, "pull_request": { "merged_at": "2023-01-03T00:00:00Z" } },
                {
                    "number": 2,
                    "repository_url": "https://api.github.com/repos/owner/repo",
                    "pull_request": { "merged_at": "2023-01-04T00:00:00Z" }
                }
            ]
        }"#;

        let resp: SearchIssuesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.items.len(), 2);
        assert!(resp.items[0].repository_url.is_empty());
        assert!(resp.items[0].merged_at().is_some());
    }

    #[test]
    fn repository_with_null_description() {
        let json = r#"{
            "name": "repo",
            "full_name": "owner/repo",
            "description": null,
            "html_url": "https://github.com/owner/repo",
            "stargazers_count": 1500
        }"#;

        let repo: Repository = serde_json::from_str(json).unwrap();
        assert_eq!(repo.stargazers_count, 1500);
        assert!(repo.description.is_none());
    }
}
