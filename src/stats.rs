use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one contribution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub username: String,
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub contributions: Vec<Contribution>,
}

impl Stats {
    pub fn empty(username: &str) -> Self {
        Self {
            username: username.to_string(),
            generated_at: Utc::now(),
            summary: Summary::default(),
            contributions: Vec::new(),
        }
    }
}

/// Totals across the retained contributions. Always derived, see [`Summary::from_contributions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_projects: u64,
    #[serde(rename = "totalPRsMerged")]
    pub total_prs_merged: u64,
    pub total_commits: u64,
    pub total_additions: u64,
    pub total_deletions: u64,
}

impl Summary {
    pub fn from_contributions(contributions: &[Contribution]) -> Self {
        contributions.iter().fold(
            Self {
                total_projects: contributions.len() as u64,
                ..Self::default()
            },
            |mut acc, c| {
                acc.total_prs_merged += c.prs_merged;
                acc.total_commits += c.commits;
                acc.total_additions += c.additions;
                acc.total_deletions += c.deletions;
                acc
            },
        )
    }
}

/// A user's merged-PR activity in one external repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    /// `owner/name` slug.
    pub repo: String,
    pub owner: String,
    pub repo_name: String,
    pub description: String,
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    pub stars: u64,
    #[serde(rename = "prsMerged")]
    pub prs_merged: u64,
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
    pub first_contribution: DateTime<Utc>,
    pub last_contribution: DateTime<Utc>,
}

/// Line and commit figures for one merged PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrTally {
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
}

impl PrTally {
    /// What a PR counts for when its details were not (or could not be) fetched.
    pub const NOMINAL: Self = Self {
        commits: 1,
        additions: 0,
        deletions: 0,
    };
}

impl Contribution {
    /// First merged PR seen for `owner/repo_name`.
    pub fn seed(owner: &str, repo_name: &str, merged_at: DateTime<Utc>, tally: PrTally) -> Self {
        Self {
            repo: format!("{owner}/{repo_name}"),
            owner: owner.to_string(),
            repo_name: repo_name.to_string(),
            description: String::new(),
            repo_url: String::new(),
            stars: 0,
            prs_merged: 1,
            commits: tally.commits,
            additions: tally.additions,
            deletions: tally.deletions,
            first_contribution: merged_at,
            last_contribution: merged_at,
        }
    }

    /// Fold another merged PR in. Sums grow, the first/last window only widens.
    pub fn fold(&mut self, merged_at: DateTime<Utc>, tally: PrTally) {
        self.prs_merged += 1;
        self.commits += tally.commits;
        self.additions += tally.additions;
        self.deletions += tally.deletions;
        self.first_contribution = self.first_contribution.min(merged_at);
        self.last_contribution = self.last_contribution.max(merged_at);
    }
}
