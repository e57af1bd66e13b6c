//! Standings client: division tables as of the game date.

use async_trait::async_trait;
use preview_core::{
    Division, DivisionQuery, DivisionRace, DivisionRaceProvider, DivisionRaceRecord, FailureReason,
    Provider, ProviderFailure, ProviderKind, ProviderResult, StandingRow, TeamCode,
    team::team_by_mlb_id,
};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::DEFAULT_BASE_URL;
use crate::http::{default_client, get_json};

/// Division race provider backed by the Stats API standings endpoint.
///
/// Implements [`Provider`] and [`DivisionRaceProvider`].
#[derive(Debug, Clone)]
pub struct DivisionRaceClient {
    client: reqwest::Client,
    base_url: String,
}

impl DivisionRaceClient {
    /// Create a new client against the public Stats API.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(default_client())
    }

    /// Create a new client with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn standings_url(&self, query: &DivisionQuery) -> String {
        let mut leagues: Vec<u32> = query.divisions.iter().map(|d| d.league_id()).collect();
        leagues.sort_unstable();
        leagues.dedup();
        let leagues: Vec<String> = leagues.iter().map(ToString::to_string).collect();
        format!(
            "{}/standings?leagueId={}&season={}&date={}&standingsTypes=regularSeason",
            self.base_url,
            leagues.join(","),
            query.season,
            query.date.format("%Y-%m-%d")
        )
    }
}

impl Default for DivisionRaceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for DivisionRaceClient {
    fn name(&self) -> &str {
        "MLB Stats API standings"
    }

    fn description(&self) -> &str {
        "Regular-season division standings"
    }
}

#[async_trait]
impl DivisionRaceProvider for DivisionRaceClient {
    #[instrument(skip(self, query), fields(season = query.season, date = %query.date))]
    async fn fetch_division_race(
        &self,
        query: &DivisionQuery,
    ) -> ProviderResult<DivisionRaceRecord> {
        let url = self.standings_url(query);
        let response: StandingsResponse =
            get_json(&self.client, ProviderKind::DivisionRace, &url).await?;
        let record = parse_standings(&query.divisions, response)?;
        debug!(
            divisions = record.races.len(),
            missing = record.missing.len(),
            "Parsed standings"
        );
        Ok(record)
    }
}

/// Builds one table per requested division, in request order.
///
/// Rows are ordered by division rank when the upstream sends one. Fails with
/// missing data only if none of the requested divisions are present.
fn parse_standings(
    divisions: &[Division],
    response: StandingsResponse,
) -> ProviderResult<DivisionRaceRecord> {
    let mut record = DivisionRaceRecord::default();

    for division in divisions {
        let Some(table) = response
            .records
            .iter()
            .find(|r| r.division.id == division.mlb_id())
        else {
            record.missing.push(*division);
            continue;
        };

        let mut ranked: Vec<(u32, StandingRow)> = Vec::with_capacity(table.team_records.len());
        for (position, row) in table.team_records.iter().enumerate() {
            let Some(team) = team_by_mlb_id(row.team.id) else {
                warn!(team_id = row.team.id, "Unknown club in standings");
                continue;
            };
            let rank = row
                .division_rank
                .as_deref()
                .and_then(|r| r.parse().ok())
                .unwrap_or(position as u32 + 1);
            ranked.push((
                rank,
                StandingRow {
                    team: TeamCode::from(team),
                    wins: row.wins,
                    losses: row.losses,
                    games_back: parse_games_back(row.division_games_back.as_deref()),
                },
            ));
        }
        ranked.sort_by_key(|(rank, _)| *rank);

        record.races.push(DivisionRace {
            division: *division,
            standings: ranked.into_iter().map(|(_, row)| row).collect(),
        });
    }

    if record.races.is_empty() && !divisions.is_empty() {
        return Err(ProviderFailure::new(
            ProviderKind::DivisionRace,
            FailureReason::MissingData("no standings for the requested divisions".to_string()),
        ));
    }
    Ok(record)
}

/// The leader's games-back is sent as "-".
fn parse_games_back(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().trim_start_matches('+').parse().ok())
        .unwrap_or(0.0)
}

// ============================================================================
// Stats API Standings Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct StandingsResponse {
    #[serde(default)]
    records: Vec<DivisionRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DivisionRecord {
    division: IdRef,
    #[serde(default)]
    team_records: Vec<TeamStanding>,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamStanding {
    team: IdRef,
    wins: u32,
    losses: u32,
    division_games_back: Option<String>,
    division_rank: Option<String>,
}
