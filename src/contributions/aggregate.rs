use chrono::Utc;

use crate::stats::{Contribution, Stats, Summary};

/// Keep repositories with at least `min_stars` stars. Zero keeps everything.
pub fn filter_min_stars(contributions: Vec<Contribution>, min_stars: u64) -> Vec<Contribution> {
    if min_stars == 0 {
        return contributions;
    }
    contributions
        .into_iter()
        .filter(|c| c.stars >= min_stars)
        .collect()
}

/// Most recently started collaboration first.
pub fn sort_by_first_contribution_desc(contributions: &mut [Contribution]) {
    contributions.sort_by(|a, b| b.first_contribution.cmp(&a.first_contribution));
}

/// Filter, order and summarise the enriched contributions.
pub fn build_stats(username: &str, contributions: Vec<Contribution>, min_stars: u64) -> Stats {
    let mut contributions = filter_min_stars(contributions, min_stars);
    sort_by_first_contribution_desc(&mut contributions);

    Stats {
        username: username.to_string(),
        generated_at: Utc::now(),
        summary: Summary::from_contributions(&contributions),
        contributions,
    }
}
