#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/preview/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Baseball Savant pitch mix provider.
//!
//! This crate provides a Statcast-backed provider that implements the
//! [`Provider`] and [`PitchMixProvider`] traits from `preview-core`.
//!
//! # Features
//!
//! - Fetch pitch-level rows using the Statcast search CSV export
//! - Built-in rate limiting (1 request per second by default)
//! - Usage, velocity, spin and whiff rate per pitch type via polars
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use preview_core::{PitchMixProvider, PitchMixQuery};
//! use preview_savant::PitchMixClient;
//!
//! # async fn example() -> preview_core::Result<()> {
//! let client = PitchMixClient::new();
//! let query = PitchMixQuery {
//!     season: 2025,
//!     through: NaiveDate::from_ymd_opt(2025, 9, 25).unwrap(),
//!     pitcher_ids: vec![676656],
//! };
//! let record = client.fetch_pitch_mix(&query).await?;
//! for pitch in &record.arsenals[&676656] {
//!     println!("{}: {:.1}%", pitch.name, pitch.usage_pct);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use preview_core::{
    FailureReason, PitchMixProvider, PitchMixQuery, PitchMixRecord, PitchUsage, PlayerId, Provider,
    ProviderFailure, ProviderKind, ProviderResult, parse_retry_after,
};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tokio::time::sleep;
use tracing::{debug, instrument};

/// Pitch-level aggregation.
pub mod arsenal;

/// Baseball Savant site root.
pub const DEFAULT_BASE_URL: &str = "https://baseballsavant.mlb.com";

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// Transport-level timeout; the retry policy usually cuts an attempt off first.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Statcast pitch mix provider.
///
/// Implements [`Provider`] and [`PitchMixProvider`].
#[derive(Debug)]
pub struct PitchMixClient {
    client: reqwest::Client,
    base_url: String,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
}

impl PitchMixClient {
    /// Create a new client with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new client with a custom HTTP client.
    ///
    /// Uses the provided client for all HTTP requests. Rate limiting
    /// is still applied.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Create a new client with custom rate limiting.
    #[must_use]
    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            rate_limit_ms: rate_limit.as_millis() as u64,
            ..Self::with_client(client)
        }
    }

    /// Point the client at a different site root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Apply rate limiting before making a request.
    async fn apply_rate_limit(&self) {
        let now = now_millis();
        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = now.saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(now_millis(), Ordering::Relaxed);
    }

    /// Build the Statcast search URL for one pitcher's season through `through`.
    fn search_url(&self, pitcher: PlayerId, season: i32, through: NaiveDate) -> String {
        format!(
            "{}/statcast_search/csv?all=true&type=details&player_type=pitcher&pitchers_lookup%5B%5D={pitcher}&game_date_gt={season}-03-01&game_date_lt={}&hfSea={season}%7C",
            self.base_url,
            through.format("%Y-%m-%d")
        )
    }

    /// Download one pitcher's pitch-level CSV.
    async fn fetch_csv(
        &self,
        pitcher: PlayerId,
        season: i32,
        through: NaiveDate,
    ) -> ProviderResult<Vec<u8>> {
        self.apply_rate_limit().await;

        let url = self.search_url(pitcher, season, through);
        debug!("Fetching Statcast pitches: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| send_failure(&e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(pitcher, status = status.as_u16(), "Statcast search rejected");
            return Err(status_failure(status, response.headers()));
        }

        let bytes = response.bytes().await.map_err(|e| send_failure(&e))?;
        Ok(bytes.to_vec())
    }

    async fn arsenal(
        &self,
        pitcher: PlayerId,
        season: i32,
        through: NaiveDate,
    ) -> ProviderResult<Vec<PitchUsage>> {
        let csv = self.fetch_csv(pitcher, season, through).await?;
        parse_arsenal(csv)
    }
}

impl Default for PitchMixClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for PitchMixClient {
    fn name(&self) -> &str {
        "Baseball Savant"
    }

    fn description(&self) -> &str {
        "Statcast pitch-level data aggregated into pitch arsenals"
    }
}

#[async_trait]
impl PitchMixProvider for PitchMixClient {
    #[instrument(
        skip(self, query),
        fields(season = query.season, pitchers = query.pitcher_ids.len())
    )]
    async fn fetch_pitch_mix(&self, query: &PitchMixQuery) -> ProviderResult<PitchMixRecord> {
        let mut record = PitchMixRecord::default();
        for pitcher in &query.pitcher_ids {
            let arsenal = self.arsenal(*pitcher, query.season, query.through).await?;
            if arsenal.is_empty() {
                record.missing.push(*pitcher);
            } else {
                debug!(pitcher, pitch_types = arsenal.len(), "Aggregated arsenal");
                record.arsenals.insert(*pitcher, arsenal);
            }
        }

        if record.arsenals.is_empty() && !query.pitcher_ids.is_empty() {
            return Err(failure(FailureReason::MissingData(format!(
                "no tracked pitches in {} for any requested pitcher",
                query.season
            ))));
        }
        Ok(record)
    }
}

/// Turns a CSV body into an arsenal. An empty body means no tracked pitches.
fn parse_arsenal(csv: Vec<u8>) -> ProviderResult<Vec<PitchUsage>> {
    if csv.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    arsenal::read_pitches(csv)
        .and_then(arsenal::summarize)
        .map_err(|e| failure(FailureReason::Malformed(e.to_string())))
}

fn failure(reason: FailureReason) -> ProviderFailure {
    ProviderFailure::new(ProviderKind::PitchMix, reason)
}

fn status_failure(status: StatusCode, headers: &HeaderMap) -> ProviderFailure {
    let retry_after = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    failure(FailureReason::from_http_status(status.as_u16(), retry_after))
}

fn send_failure(error: &reqwest::Error) -> ProviderFailure {
    if error.is_timeout() {
        failure(FailureReason::Timeout(REQUEST_TIMEOUT))
    } else {
        failure(FailureReason::Network(error.to_string()))
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_status_mapping() {
        let none = HeaderMap::new();
        let not_found = status_failure(StatusCode::NOT_FOUND, &none);
        assert_eq!(not_found.provider, ProviderKind::PitchMix);
        assert!(matches!(not_found.reason, FailureReason::MissingData(_)));
        assert!(status_failure(StatusCode::BAD_GATEWAY, &none).is_transient());

        // Without a hint the retry policy's own backoff applies.
        assert_eq!(
            status_failure(StatusCode::TOO_MANY_REQUESTS, &none).reason,
            FailureReason::RateLimited { retry_after: None }
        );
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("5"));
        assert_eq!(
            status_failure(StatusCode::TOO_MANY_REQUESTS, &headers).reason,
            FailureReason::RateLimited {
                retry_after: Some(Duration::from_secs(5))
            }
        );
    }

    #[test]
    fn test_search_url() {
        let client = PitchMixClient::new();
        let through = NaiveDate::from_ymd_opt(2025, 9, 25).unwrap();
        let url = client.search_url(676656, 2025, through);

        assert!(url.starts_with("https://baseballsavant.mlb.com/statcast_search/csv?"));
        assert!(url.contains("pitchers_lookup%5B%5D=676656"));
        assert!(url.contains("game_date_gt=2025-03-01"));
        assert!(url.contains("game_date_lt=2025-09-25"));
    }

    #[test]
    fn test_empty_body_is_empty_arsenal() {
        assert!(parse_arsenal(Vec::new()).unwrap().is_empty());
        assert!(parse_arsenal(b" \n".to_vec()).unwrap().is_empty());
    }

    #[test]
    fn test_unexpected_body_is_malformed() {
        let err = parse_arsenal(b"<html>maintenance</html>\n".to_vec()).unwrap_err();
        assert_eq!(err.provider, ProviderKind::PitchMix);
        assert!(matches!(err.reason, FailureReason::Malformed(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_spaces_requests() {
        let client = PitchMixClient::with_rate_limit(Duration::from_millis(50));
        let start = std::time::Instant::now();
        client.apply_rate_limit().await;
        client.apply_rate_limit().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_provider_info() {
        assert_eq!(PitchMixClient::default().name(), "Baseball Savant");
    }
}
