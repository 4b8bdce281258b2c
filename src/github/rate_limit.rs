//! Rate-limit governor.
//!
//! Decides whether a response is throttled or worth retrying, and how long to
//! pause before the next attempt. GitHub reports quota through the
//! `x-ratelimit-remaining` / `x-ratelimit-reset` headers; when they are missing
//! or already stale we fall back to exponential backoff. Every wait goes
//! through the caller's [`Context`] so it can be cut short.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use thiserror::Error;
use tracing::debug;

use super::ResponseMeta;
use crate::context::{Cancelled, Context};

pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Attempts at or above this count fail instead of waiting.
pub const MAX_BACKOFF_ATTEMPTS: u32 = 5;

pub const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Pause between search result pages. The search API allows 30 requests per
/// minute against 5000 per hour for the core API.
pub const SEARCH_API_DELAY: Duration = Duration::from_secs(2);

/// Quota state parsed from a single response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitInfo {
    /// Both headers must be present and numeric.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let remaining = headers
            .get(RATE_LIMIT_REMAINING_HEADER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()?;

        let reset = headers
            .get(RATE_LIMIT_RESET_HEADER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<i64>()
            .ok()?;

        let reset_at = DateTime::from_timestamp(reset, 0)?;

        Some(Self { remaining, reset_at })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernorError {
    #[error("max retry attempts ({0}) reached for rate limiting")]
    MaxAttempts(u32),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// 429, or 403 with the quota exhausted (zero remaining calls or a `Retry-After`
/// from the secondary limiter). A bare 403 is a permissions problem.
pub fn is_rate_limited(meta: Option<&ResponseMeta>) -> bool {
    let Some(meta) = meta else {
        return false;
    };

    match meta.status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => {
            let exhausted = meta
                .headers
                .get(RATE_LIMIT_REMAINING_HEADER)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim() == "0");
            exhausted || meta.headers.contains_key(RETRY_AFTER)
        }
        _ => false,
    }
}

pub fn should_retry(meta: Option<&ResponseMeta>) -> bool {
    meta.is_some_and(|m| {
        matches!(
            m.status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::FORBIDDEN
                | StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
    })
}

/// `BASE_BACKOFF * 2^attempt`, attempt counted from zero.
pub fn backoff_delay(attempt: u32) -> Duration {
    BASE_BACKOFF.saturating_mul(1u32 << attempt.min(31))
}

fn compute_wait(
    reset_at: Option<DateTime<Utc>>,
    attempt: u32,
    now: DateTime<Utc>,
) -> Result<Duration, GovernorError> {
    if attempt >= MAX_BACKOFF_ATTEMPTS {
        return Err(GovernorError::MaxAttempts(MAX_BACKOFF_ATTEMPTS));
    }

    let until_reset = reset_at
        .and_then(|reset| (reset - now).to_std().ok())
        .filter(|d| !d.is_zero());

    Ok(until_reset.unwrap_or_else(|| backoff_delay(attempt)))
}

/// How long to pause before retry number `attempt` of the request that produced `meta`.
pub fn wait_duration(
    meta: Option<&ResponseMeta>,
    attempt: u32,
    now: DateTime<Utc>,
) -> Result<Duration, GovernorError> {
    let reset_at = meta
        .and_then(|m| RateLimitInfo::from_headers(&m.headers))
        .map(|info| info.reset_at);
    compute_wait(reset_at, attempt, now)
}

/// Sleep as long as [`wait_duration`] says, unless `ctx` ends first.
pub async fn handle_rate_limit(
    ctx: &Context,
    meta: Option<&ResponseMeta>,
    attempt: u32,
) -> Result<(), GovernorError> {
    let wait = wait_duration(meta, attempt, Utc::now())?;
    debug!(attempt, wait_ms = wait.as_millis() as u64, "rate limited, backing off");
    ctx.sleep(wait).await?;
    Ok(())
}

/// Wait for a known reset instant, falling back to backoff when it has passed.
pub async fn wait_for_reset(
    ctx: &Context,
    reset_at: DateTime<Utc>,
    attempt: u32,
) -> Result<(), GovernorError> {
    let wait = compute_wait(Some(reset_at), attempt, Utc::now())?;
    debug!(attempt, %reset_at, wait_secs = wait.as_secs(), "waiting for rate limit reset");
    ctx.sleep(wait).await?;
    Ok(())
}

/// Fixed pause applied before every search page after the first.
pub async fn wait_for_search_api(ctx: &Context) -> Result<(), Cancelled> {
    ctx.sleep(SEARCH_API_DELAY).await
}

/// True when the remaining quota is at or below `threshold`. Unknown quota never counts as low.
pub fn is_below_threshold(info: Option<&RateLimitInfo>, threshold: u64) -> bool {
    info.is_some_and(|i| i.remaining <= threshold)
}

pub fn reset_time_display(info: Option<&RateLimitInfo>) -> String {
    info.map_or_else(
        || "unknown".to_string(),
        |i| i.reset_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    )
}
