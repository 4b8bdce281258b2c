use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, ensure};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use gh_oss_stats::config::{DEFAULT_MAX_PRS, DEFAULT_MOCK_DATA_DIR, DEFAULT_TIMEOUT};
use gh_oss_stats::github::GITHUB_API_BASE_URL;
use gh_oss_stats::github::rate_limit::{self, GovernorError};
use gh_oss_stats::svg::{self, DEFAULT_BADGE_LIMIT, Theme};
use gh_oss_stats::{Client, Config, Context, Error, Stats};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Fetch GitHub OSS contribution statistics and optionally render an SVG badge.
#[derive(Debug, Parser)]
#[command(name = "gh-oss-stats", version)]
struct Cli {
    /// GitHub username
    #[arg(short, long)]
    user: String,

    /// GitHub token
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Fetch commit and line counts for every PR (one request each)
    #[arg(long)]
    include_loc: bool,

    /// Minimum repository stars
    #[arg(long, default_value_t = 0)]
    min_stars: u64,

    /// Maximum number of PRs to fetch
    #[arg(long, default_value_t = DEFAULT_MAX_PRS)]
    max_prs: usize,

    /// Comma separated organisations to exclude
    #[arg(long)]
    exclude_orgs: Option<String>,

    /// Timeout for the whole run, in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Serve canned responses instead of calling GitHub
    #[arg(long)]
    debug: bool,

    /// Fixture directory used with --debug
    #[arg(long, default_value = DEFAULT_MOCK_DATA_DIR)]
    mock_data_dir: PathBuf,

    #[arg(long, default_value = GITHUB_API_BASE_URL, hide = true)]
    api_base_url: String,

    /// Render an SVG badge
    #[arg(long)]
    badge: bool,

    #[arg(long, value_enum, default_value_t = BadgeTheme::Dark)]
    badge_theme: BadgeTheme,

    /// Number of top contributions on the badge
    #[arg(long, default_value_t = DEFAULT_BADGE_LIMIT)]
    badge_limit: usize,

    #[arg(long, default_value = "oss-badge.svg")]
    badge_output: PathBuf,

    /// On a search rate limit, wait for the reset and start over
    #[arg(long)]
    wait_on_rate_limit: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BadgeTheme {
    Dark,
    Light,
}

impl From<BadgeTheme> for Theme {
    fn from(theme: BadgeTheme) -> Self {
        match theme {
            BadgeTheme::Dark => Theme::Dark,
            BadgeTheme::Light => Theme::Light,
        }
    }
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            token: self.token.clone().filter(|t| !t.is_empty()),
            include_loc: self.include_loc,
            min_stars: self.min_stars,
            max_prs: self.max_prs,
            timeout: Duration::from_secs(self.timeout),
            exclude_orgs: self
                .exclude_orgs
                .as_deref()
                .map(Config::parse_org_list)
                .unwrap_or_default(),
            debug: self.debug,
            mock_data_dir: self.mock_data_dir.clone(),
            api_base_url: self.api_base_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if let Some(Error::Authentication { .. }) = err.downcast_ref::<Error>() {
                eprintln!("Hint: provide a token with --token or set GITHUB_TOKEN");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "gh_oss_stats=debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    ensure!(cli.badge_limit > 0, "--badge-limit must be > 0");

    let config = cli.config();
    if config.token.is_none() && !config.debug {
        eprintln!(
            "Warning: no GitHub token provided; unauthenticated requests are limited to 60/hour."
        );
        eprintln!("Hint: set GITHUB_TOKEN or pass --token");
    }

    let client = Client::new(config)?;

    let (ctx, canceller) = Context::cancellable();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            canceller.cancel();
        }
    });

    let stats = match fetch(&client, &ctx, &cli.user, cli.wait_on_rate_limit).await {
        Ok(stats) => stats,
        Err(Error::PartialResults(partial)) => {
            eprintln!("Warning: {partial}");
            for err in &partial.errors {
                warn!(error = %err, "absorbed error");
            }
            partial.stats
        }
        Err(err) => return Err(err.into()),
    };

    write_stats(&stats, cli.output.as_ref())?;

    if cli.badge {
        let badge = svg::render_badge(
            &stats,
            cli.badge_theme.into(),
            cli.badge_limit,
            Utc::now().date_naive(),
        );
        fs::write(&cli.badge_output, badge)
            .with_context(|| format!("writing badge to {}", cli.badge_output.display()))?;
        info!(path = %cli.badge_output.display(), "badge written");
    }

    Ok(())
}

/// Run the pipeline, optionally sleeping through search rate limits.
async fn fetch(
    client: &Client,
    ctx: &Context,
    username: &str,
    wait_on_rate_limit: bool,
) -> gh_oss_stats::Result<Stats> {
    let mut attempt = 0;
    loop {
        match client.get_contributions(ctx, username).await {
            Err(Error::RateLimited { reset_at, message }) if wait_on_rate_limit => {
                warn!(%reset_at, attempt, "search rate limited, waiting for reset");
                match rate_limit::wait_for_reset(ctx, reset_at, attempt).await {
                    Ok(()) => attempt += 1,
                    Err(GovernorError::Cancelled(reason)) => return Err(reason.into()),
                    Err(GovernorError::MaxAttempts(_)) => {
                        return Err(Error::RateLimited { reset_at, message });
                    }
                }
            }
            result => return result,
        }
    }
}

fn write_stats(stats: &Stats, output: Option<&PathBuf>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(stats).context("encoding stats")?;

    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("writing stats to {}", path.display()))?;
            info!(path = %path.display(), "stats written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
