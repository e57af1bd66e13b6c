#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/preview/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! FanGraphs sabermetric stats provider.
//!
//! This crate implements [`StatsProvider`] for the
//! [FanGraphs](https://www.fangraphs.com/) leaderboards.
//!
//! # Usage
//!
//! ```rust,ignore
//! use preview_core::{Lineups, StatsProvider, StatsQuery};
//! use preview_fangraphs::SabermetricStatsClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SabermetricStatsClient::new();
//!     let query = StatsQuery {
//!         season: 2025,
//!         pitcher_ids: vec![573186, 676656],
//!         lineups: Lineups::default(),
//!     };
//!     let record = client.fetch_stats(&query).await?;
//!     println!("{} pitcher lines", record.pitchers.len());
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use preview_core::{
    BatterLine, FailureReason, LineupSlot, Lineups, PitcherStats, PlayerId, Provider,
    ProviderFailure, ProviderKind, ProviderResult, StatsProvider, StatsQuery, StatsRecord,
    parse_retry_after,
};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// FanGraphs API root.
pub const DEFAULT_BASE_URL: &str = "https://www.fangraphs.com";

/// Transport-level timeout; the retry policy usually cuts an attempt off first.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which leaderboard to request.
#[derive(Clone, Copy, Debug)]
enum Board {
    Pitching,
    Batting,
}

impl Board {
    const fn param(self) -> &'static str {
        match self {
            Self::Pitching => "pit",
            Self::Batting => "bat",
        }
    }
}

/// Sabermetric stats provider backed by the FanGraphs leaderboards.
///
/// Provides:
/// - Pitcher season lines (ERA, FIP, WHIP, rate stats, WAR)
/// - Batter season lines for posted lineups (slash line, wRC+, counting stats)
#[derive(Debug, Clone)]
pub struct SabermetricStatsClient {
    client: Client,
    base_url: String,
}

impl SabermetricStatsClient {
    /// Create a new client against fangraphs.com.
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    /// Create a new client with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different site root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn leaders_url(&self, board: Board, season: i32) -> String {
        format!(
            "{}/api/leaders/major-league/data?pos=all&stats={}&lg=all&qual=0&season={season}&season1={season}&ind=0&pageitems=2000000000&type=8&month=0",
            self.base_url,
            board.param()
        )
    }

    /// Make a GET request and parse the JSON response.
    async fn get<T: DeserializeOwned>(&self, board: Board, season: i32) -> ProviderResult<T> {
        let url = self.leaders_url(board, season);
        debug!("FanGraphs request: {} board, season {}", board.param(), season);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| send_failure(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_failure(status, response.headers()));
        }

        let text = response.text().await.map_err(|e| send_failure(&e))?;
        serde_json::from_str(&text).map_err(|e| failure(FailureReason::Malformed(e.to_string())))
    }

    async fn board<T: DeserializeOwned>(
        &self,
        board: Board,
        season: i32,
        wanted: bool,
    ) -> ProviderResult<Vec<T>> {
        if !wanted {
            return Ok(Vec::new());
        }
        let response: Leaderboard<T> = self.get(board, season).await?;
        Ok(response.data)
    }
}

impl Default for SabermetricStatsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for SabermetricStatsClient {
    fn name(&self) -> &str {
        "FanGraphs"
    }

    fn description(&self) -> &str {
        "Sabermetric season lines for pitchers and batters"
    }
}

#[async_trait]
impl StatsProvider for SabermetricStatsClient {
    #[instrument(
        skip(self, query),
        fields(
            season = query.season,
            pitchers = query.pitcher_ids.len(),
            batters = query.lineups.len()
        )
    )]
    async fn fetch_stats(&self, query: &StatsQuery) -> ProviderResult<StatsRecord> {
        let (pitchers, batters) = tokio::try_join!(
            self.board::<PitcherRow>(Board::Pitching, query.season, !query.pitcher_ids.is_empty()),
            self.board::<BatterRow>(Board::Batting, query.season, !query.lineups.is_empty()),
        )?;
        let record = build_record(query, &pitchers, &batters)?;
        debug!(
            pitchers = record.pitchers.len(),
            batters = record.lineups.len(),
            missing = record.missing.len(),
            "Matched stat lines"
        );
        Ok(record)
    }
}

fn failure(reason: FailureReason) -> ProviderFailure {
    ProviderFailure::new(ProviderKind::Stats, reason)
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

/// Matches leaderboard rows to the requested players.
///
/// Fails only if the query asked for something and nothing matched.
fn build_record(
    query: &StatsQuery,
    pitchers: &[PitcherRow],
    batters: &[BatterRow],
) -> ProviderResult<StatsRecord> {
    let mut record = StatsRecord::default();

    for id in &query.pitcher_ids {
        match pitchers.iter().find(|row| row.mlbam_id == Some(*id)) {
            Some(row) => {
                record.pitchers.insert(*id, row.to_stats(*id));
            }
            None => record.missing.push(*id),
        }
    }

    let by_id: BTreeMap<PlayerId, &BatterRow> = batters
        .iter()
        .filter_map(|row| row.mlbam_id.map(|id| (id, row)))
        .collect();
    let mut side = |slots: &[LineupSlot]| -> Vec<BatterLine> {
        let mut lines = Vec::with_capacity(slots.len());
        for slot in slots {
            match by_id.get(&slot.player_id) {
                Some(row) => lines.push(row.to_line(slot)),
                None => record.missing.push(slot.player_id),
            }
        }
        lines
    };
    let lineups = Lineups {
        away: side(&query.lineups.away),
        home: side(&query.lineups.home),
    };
    record.lineups = lineups;
    record.missing.sort_unstable();
    record.missing.dedup();

    if !query.is_empty() && record.pitchers.is_empty() && record.lineups.is_empty() {
        return Err(failure(FailureReason::MissingData(format!(
            "no {} lines for any requested player",
            query.season
        ))));
    }
    Ok(record)
}

fn count(value: Option<f64>) -> Option<u32> {
    value.filter(|v| *v >= 0.0).map(|v| v.round() as u32)
}

// ============================================================================
// FanGraphs API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Leaderboard<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PitcherRow {
    #[serde(rename = "xMLBAMID")]
    mlbam_id: Option<PlayerId>,
    #[serde(rename = "PlayerName", default)]
    name: String,
    #[serde(rename = "Throws")]
    throws: Option<String>,
    #[serde(rename = "W")]
    wins: Option<f64>,
    #[serde(rename = "L")]
    losses: Option<f64>,
    #[serde(rename = "ERA")]
    era: Option<f64>,
    #[serde(rename = "IP")]
    innings: Option<f64>,
    #[serde(rename = "WHIP")]
    whip: Option<f64>,
    #[serde(rename = "K/9")]
    k_per_9: Option<f64>,
    #[serde(rename = "BB/9")]
    bb_per_9: Option<f64>,
    #[serde(rename = "HR/9")]
    hr_per_9: Option<f64>,
    #[serde(rename = "FIP")]
    fip: Option<f64>,
    #[serde(rename = "WAR")]
    war: Option<f64>,
    #[serde(rename = "GB%")]
    gb_rate: Option<f64>,
}

impl PitcherRow {
    fn to_stats(&self, id: PlayerId) -> PitcherStats {
        PitcherStats {
            player_id: id,
            name: self.name.clone(),
            hand: self.throws.clone(),
            wins: count(self.wins),
            losses: count(self.losses),
            era: self.era,
            innings: self.innings,
            whip: self.whip,
            k_per_9: self.k_per_9,
            bb_per_9: self.bb_per_9,
            hr_per_9: self.hr_per_9,
            fip: self.fip,
            war: self.war,
            gb_pct: self.gb_rate.map(|r| r * 100.0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatterRow {
    #[serde(rename = "xMLBAMID")]
    mlbam_id: Option<PlayerId>,
    #[serde(rename = "PlayerName", default)]
    name: String,
    #[serde(rename = "Age")]
    age: Option<f64>,
    #[serde(rename = "PA")]
    plate_appearances: Option<f64>,
    #[serde(rename = "AVG")]
    avg: Option<f64>,
    #[serde(rename = "OBP")]
    obp: Option<f64>,
    #[serde(rename = "SLG")]
    slg: Option<f64>,
    #[serde(rename = "OPS")]
    ops: Option<f64>,
    #[serde(rename = "wRC+")]
    wrc_plus: Option<f64>,
    #[serde(rename = "HR")]
    home_runs: Option<f64>,
    #[serde(rename = "RBI")]
    rbi: Option<f64>,
    #[serde(rename = "SB")]
    stolen_bases: Option<f64>,
    #[serde(rename = "WAR")]
    war: Option<f64>,
}

impl BatterRow {
    fn to_line(&self, slot: &LineupSlot) -> BatterLine {
        BatterLine {
            player_id: slot.player_id,
            name: if self.name.is_empty() {
                slot.name.clone()
            } else {
                self.name.clone()
            },
            position: slot.position.clone(),
            age: count(self.age),
            plate_appearances: count(self.plate_appearances),
            avg: self.avg,
            obp: self.obp,
            slg: self.slg,
            ops: self.ops,
            wrc_plus: self.wrc_plus,
            home_runs: count(self.home_runs),
            rbi: count(self.rbi),
            stolen_bases: count(self.stolen_bases),
            war: self.war,
        }
    }
}
