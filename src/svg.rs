//! Terminal-style SVG card summarising a [`Stats`] run.

use std::cmp::Reverse;
use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::age::CalendarSpan;
use crate::stats::{Contribution, Stats};

const START_Y: i32 = 30;
const LINE_HEIGHT: i32 = 20;
const LEFT_PADDING: f32 = 15.0;
const RIGHT_PADDING: f32 = 30.0;
const CHAR_WIDTH: f32 = 9.6;
const MIN_ALIGN_CHARS: usize = 44;

pub const DEFAULT_BADGE_LIMIT: usize = 5;

/// Badge colour scheme, selected with `--badge-theme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Fill colours for the card background and the three text classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub border: &'static str,
    pub label: &'static str,
    pub figure: &'static str,
    pub muted: &'static str,
}

const DARK: Palette = Palette {
    background: "#0d1117",
    border: "#30363d",
    label: "#f0883e",
    figure: "#79c0ff",
    muted: "#8b949e",
};

const LIGHT: Palette = Palette {
    background: "#f6f8fa",
    border: "#d0d7de",
    label: "#bc4c00",
    figure: "#0969da",
    muted: "#57606a",
};

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => DARK,
            Theme::Light => LIGHT,
        }
    }
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `key: ....... value`, padded with dots to `align_width` characters.
pub fn build_stat_row(key: &str, value: &str, align_width: usize) -> (String, String, String) {
    let key_part = format!("{key}: ");
    let used = key_part.chars().count() + value.chars().count();

    let dots = match align_width.saturating_sub(used) {
        0 => String::new(),
        1 => " ".to_string(),
        2 => ". ".to_string(),
        n => ".".repeat(n),
    };

    (key_part, dots, value.to_string())
}

pub fn build_header_line(label: &str, align_width: usize) -> String {
    let base = format!("{label} ");
    let dash_count = align_width.saturating_sub(base.chars().count()) + 2;
    format!("{base}{}", "-".repeat(dash_count))
}

/// Up to `limit` contributions, most PRs first, stars breaking ties.
pub fn top_contributions(stats: &Stats, limit: usize) -> Vec<&Contribution> {
    let mut top: Vec<&Contribution> = stats.contributions.iter().collect();
    top.sort_by_key(|c| (Reverse(c.prs_merged), Reverse(c.stars)));
    top.truncate(limit);
    top
}

enum Line {
    Header(String),
    Blank,
    Stat { key: String, value: String },
}

fn card_lines(stats: &Stats, limit: usize, today: NaiveDate) -> Vec<Line> {
    let summary = &stats.summary;
    let active_for = stats
        .contributions
        .iter()
        .map(|c| c.first_contribution.date_naive())
        .min()
        .map_or_else(|| "-".to_string(), |since| CalendarSpan::between(since, today).to_string());

    let stat = |key: &str, value: String| Line::Stat {
        key: key.to_string(),
        value,
    };

    let mut lines = vec![
        Line::Header(format!("{}@oss", stats.username)),
        stat("Projects", summary.total_projects.to_string()),
        stat("PRs merged", summary.total_prs_merged.to_string()),
        stat("Commits", summary.total_commits.to_string()),
        stat(
            "Lines",
            format!("+{} / -{}", summary.total_additions, summary.total_deletions),
        ),
        stat("Active for", active_for),
    ];

    let top = top_contributions(stats, limit);
    if !top.is_empty() {
        lines.push(Line::Blank);
        lines.push(Line::Header("- Top contributions".to_string()));
        for c in top {
            let prs = if c.prs_merged == 1 { "PR" } else { "PRs" };
            lines.push(stat(
                &c.repo,
                format!("{} {prs}, {} stars", c.prs_merged, c.stars),
            ));
        }
    }

    lines
}

/// Render the badge for `stats`. `today` anchors the "active for" span.
pub fn render_badge(stats: &Stats, theme: Theme, limit: usize, today: NaiveDate) -> String {
    let palette = theme.palette();
    let lines = card_lines(stats, limit, today);

    let align_width = lines
        .iter()
        .filter_map(|line| match line {
            Line::Stat { key, value } => Some(key.chars().count() + 2 + value.chars().count()),
            Line::Header(_) | Line::Blank => None,
        })
        .max()
        .unwrap_or(0)
        .max(MIN_ALIGN_CHARS);

    let mut tspans = String::new();
    for (i, line) in lines.iter().enumerate() {
        let y = START_Y + (i as i32) * LINE_HEIGHT;
        match line {
            Line::Blank => {}
            Line::Header(label) => {
                let _ = writeln!(
                    tspans,
                    r#"<tspan x="{LEFT_PADDING}" y="{y}">{}</tspan>"#,
                    escape_xml(&build_header_line(label, align_width))
                );
            }
            Line::Stat { key, value } => {
                let (k, d, v) = build_stat_row(key, value, align_width);
                let _ = writeln!(
                    tspans,
                    r#"<tspan x="{LEFT_PADDING}" y="{y}" class="cc">. </tspan><tspan class="key">{}</tspan><tspan class="cc">{}</tspan><tspan class="value">{}</tspan>"#,
                    escape_xml(&k),
                    escape_xml(&d),
                    escape_xml(&v)
                );
            }
        }
    }

    // ". " prefix plus the header's trailing dashes.
    let w = LEFT_PADDING + ((align_width + 4) as f32) * CHAR_WIDTH + RIGHT_PADDING;
    let h = (lines.len() as f32) * LINE_HEIGHT as f32 + START_Y as f32;

    format!(
        r#"<?xml version='1.0' encoding='UTF-8'?>
<svg xmlns="http://www.w3.org/2000/svg"
     width="{w}px" height="{h}px"
     font-family="ConsolasFallback,Consolas,monospace"
     font-size="16px">

<style>
.key   {{ fill: {label}; }}
.value {{ fill: {figure}; }}
.cc    {{ fill: {muted}; }}
</style>

<rect width="{w}px" height="{h}px" fill="{background}" stroke="{border}" rx="15"/>

<text fill="{muted}">
{tspans}</text>

</svg>
"#,
        background = palette.background,
        border = palette.border,
        label = palette.label,
        figure = palette.figure,
        muted = palette.muted,
    )
}
