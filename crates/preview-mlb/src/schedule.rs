//! Schedule client: venue, start time, records, probable pitchers, lineups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use preview_core::{
    FailureReason, GameIdentity, GameInfo, GameInfoProvider, GameInfoRecord, GameQuery,
    LineupSlot, Lineups, PitcherRef, ProbablePitchers, Provider, ProviderFailure, ProviderKind,
    ProviderResult, TeamRecord,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::DEFAULT_BASE_URL;
use crate::http::{default_client, get_json};

/// Game info provider backed by the Stats API schedule endpoint.
///
/// Implements [`Provider`] and [`GameInfoProvider`].
#[derive(Debug, Clone)]
pub struct GameInfoClient {
    client: reqwest::Client,
    base_url: String,
}

impl GameInfoClient {
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

    /// Build the schedule URL for the home club on the game date.
    fn schedule_url(&self, identity: &GameIdentity, home_id: u32) -> String {
        format!(
            "{}/schedule?sportId=1&date={}&teamId={}&hydrate=probablePitcher,venue,lineups",
            self.base_url,
            identity.game_date.format("%Y-%m-%d"),
            home_id
        )
    }
}

impl Default for GameInfoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for GameInfoClient {
    fn name(&self) -> &str {
        "MLB Stats API schedule"
    }

    fn description(&self) -> &str {
        "Venue, first pitch, records, probable pitchers and posted lineups"
    }
}

#[async_trait]
impl GameInfoProvider for GameInfoClient {
    #[instrument(skip(self, query), fields(game = %query.identity))]
    async fn fetch_game_info(&self, query: &GameQuery) -> ProviderResult<GameInfoRecord> {
        let (away_id, home_id) = club_ids(&query.identity)?;
        let url = self.schedule_url(&query.identity, home_id);
        let response: ScheduleResponse =
            get_json(&self.client, ProviderKind::GameInfo, &url).await?;
        let record = parse_schedule(&query.identity, away_id, home_id, response)?;
        debug!(
            game_pk = ?record.game.game_pk,
            lineup_slots = record.lineups.len(),
            "Parsed schedule"
        );
        Ok(record)
    }
}

fn club_ids(identity: &GameIdentity) -> ProviderResult<(u32, u32)> {
    match (identity.away_team.team(), identity.home_team.team()) {
        (Some(away), Some(home)) => Ok((away.mlb_id, home.mlb_id)),
        _ => Err(ProviderFailure::new(
            ProviderKind::GameInfo,
            FailureReason::MissingData(format!("no Stats API team id for {identity}")),
        )),
    }
}

/// Picks the matching game out of a schedule response.
///
/// For a doubleheader the first game listed is used.
fn parse_schedule(
    identity: &GameIdentity,
    away_id: u32,
    home_id: u32,
    response: ScheduleResponse,
) -> ProviderResult<GameInfoRecord> {
    let game = response
        .dates
        .into_iter()
        .flat_map(|d| d.games)
        .find(|g| g.teams.away.team.id == away_id && g.teams.home.team.id == home_id)
        .ok_or_else(|| {
            ProviderFailure::new(
                ProviderKind::GameInfo,
                FailureReason::MissingData(format!("no game scheduled for {identity}")),
            )
        })?;

    let lineups = game
        .lineups
        .map(|l| Lineups {
            away: l.away_players.into_iter().map(ApiPlayer::into_slot).collect(),
            home: l.home_players.into_iter().map(ApiPlayer::into_slot).collect(),
        })
        .unwrap_or_default();

    let info = GameInfo {
        game_pk: Some(game.game_pk),
        venue: game.venue.and_then(|v| v.name),
        start_time: game.game_date,
        status: game.status.and_then(|s| s.detailed_state),
        away_record: game.teams.away.league_record.map(ApiRecord::into_record),
        home_record: game.teams.home.league_record.map(ApiRecord::into_record),
        probable_pitchers: ProbablePitchers {
            away: game.teams.away.probable_pitcher.map(ApiPerson::into_ref),
            home: game.teams.home.probable_pitcher.map(ApiPerson::into_ref),
        },
    };

    Ok(GameInfoRecord {
        game: info,
        lineups,
    })
}

// ============================================================================
// Stats API Schedule Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ScheduleResponse {
    #[serde(default)]
    dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize)]
struct ScheduleDate {
    #[serde(default)]
    games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleGame {
    game_pk: u64,
    game_date: Option<DateTime<Utc>>,
    status: Option<GameStatus>,
    teams: GameTeams,
    venue: Option<Venue>,
    lineups: Option<ApiLineups>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameStatus {
    detailed_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GameTeams {
    away: GameTeam,
    home: GameTeam,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameTeam {
    team: TeamRef,
    league_record: Option<ApiRecord>,
    probable_pitcher: Option<ApiPerson>,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    wins: u32,
    losses: u32,
}

impl ApiRecord {
    fn into_record(self) -> TeamRecord {
        TeamRecord {
            wins: self.wins,
            losses: self.losses,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPerson {
    id: u64,
    full_name: Option<String>,
}

impl ApiPerson {
    fn into_ref(self) -> PitcherRef {
        PitcherRef {
            id: self.id,
            name: self.full_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Venue {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiLineups {
    #[serde(default)]
    away_players: Vec<ApiPlayer>,
    #[serde(default)]
    home_players: Vec<ApiPlayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlayer {
    id: u64,
    #[serde(default)]
    full_name: String,
    primary_position: Option<Position>,
}

impl ApiPlayer {
    fn into_slot(self) -> LineupSlot {
        LineupSlot {
            player_id: self.id,
            name: self.full_name,
            position: self.primary_position.map(|p| p.abbreviation),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Position {
    abbreviation: String,
}
