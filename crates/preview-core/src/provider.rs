//! Provider traits for fetching game preview data.
//!
//! This module defines the core provider traits:
//!
//! - [`Provider`] - Base trait for all upstream clients
//! - [`GameInfoProvider`] - Schedule, venue, probable pitchers, posted lineups
//! - [`StatsProvider`] - Sabermetric pitcher and batter lines
//! - [`PitchMixProvider`] - Per-pitcher pitch arsenals
//! - [`DivisionRaceProvider`] - Division standings
//!
//! Every capability returns a typed record or a [`ProviderFailure`], so the
//! orchestrator treats all providers the same way.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};

use crate::{
    error::ProviderResult,
    team::Division,
    types::{
        BatterLine, DivisionRace, GameIdentity, GameInfo, LineupSlot, Lineups, PitchUsage,
        PitcherStats, PlayerId,
    },
};

/// The closed set of providers a snapshot is assembled from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Schedule and game metadata.
    GameInfo,
    /// Sabermetric pitcher and lineup stats.
    Stats,
    /// Pitch-level tracking data.
    PitchMix,
    /// Division standings.
    DivisionRace,
}

impl ProviderKind {
    /// All providers, in fetch order.
    pub const ALL: [Self; 4] = [Self::GameInfo, Self::Stats, Self::PitchMix, Self::DivisionRace];

    /// Stable snake_case name used in logs and cached documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GameInfo => "game_info",
            Self::Stats => "stats",
            Self::PitchMix => "pitch_mix",
            Self::DivisionRace => "division_race",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Base trait for all upstream clients.
pub trait Provider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "MLB Stats API").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Query for [`GameInfoProvider`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameQuery {
    /// The game to look up.
    pub identity: GameIdentity,
}

/// Schedule data for one game, plus lineups if they have been posted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameInfoRecord {
    /// Game metadata.
    pub game: GameInfo,
    /// Posted batting orders; empty until the clubs announce them.
    pub lineups: Lineups<LineupSlot>,
}

/// Provider for schedule and game metadata.
#[async_trait]
pub trait GameInfoProvider: Provider {
    /// Fetches game metadata for the identity's date and clubs.
    async fn fetch_game_info(&self, query: &GameQuery) -> ProviderResult<GameInfoRecord>;
}

/// Query for [`StatsProvider`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatsQuery {
    /// Season to pull lines for.
    pub season: i32,
    /// Pitchers to look up.
    pub pitcher_ids: Vec<PlayerId>,
    /// Batters to look up, in batting order.
    pub lineups: Lineups<LineupSlot>,
}

impl StatsQuery {
    /// Returns true if there is nobody to look up.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pitcher_ids.is_empty() && self.lineups.is_empty()
    }
}

/// Stat lines for the requested players.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatsRecord {
    /// Pitcher lines keyed by player id.
    pub pitchers: BTreeMap<PlayerId, PitcherStats>,
    /// Batter lines per side, in batting order.
    pub lineups: Lineups<BatterLine>,
    /// Requested players the upstream had no line for.
    pub missing: Vec<PlayerId>,
}

/// Provider for sabermetric pitcher and batter lines.
#[async_trait]
pub trait StatsProvider: Provider {
    /// Fetches season lines for the requested players.
    async fn fetch_stats(&self, query: &StatsQuery) -> ProviderResult<StatsRecord>;
}

/// Query for [`PitchMixProvider`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PitchMixQuery {
    /// Season to aggregate.
    pub season: i32,
    /// Last date (inclusive) of pitches to include.
    pub through: NaiveDate,
    /// Pitchers to aggregate.
    pub pitcher_ids: Vec<PlayerId>,
}

/// Pitch arsenals for the requested pitchers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PitchMixRecord {
    /// Arsenals keyed by pitcher id, most used pitch first.
    pub arsenals: BTreeMap<PlayerId, Vec<PitchUsage>>,
    /// Requested pitchers with no tracked pitches.
    pub missing: Vec<PlayerId>,
}

/// Provider for pitch-level tracking data.
#[async_trait]
pub trait PitchMixProvider: Provider {
    /// Fetches and aggregates pitch arsenals.
    async fn fetch_pitch_mix(&self, query: &PitchMixQuery) -> ProviderResult<PitchMixRecord>;
}

/// Query for [`DivisionRaceProvider`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DivisionQuery {
    /// Season of the standings.
    pub season: i32,
    /// Standings as of this date.
    pub date: NaiveDate,
    /// Divisions to return, in output order.
    pub divisions: Vec<Division>,
}

/// Standings for the requested divisions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DivisionRaceRecord {
    /// One table per division found, in query order.
    pub races: Vec<DivisionRace>,
    /// Requested divisions missing from the response.
    pub missing: Vec<Division>,
}

/// Provider for division standings.
#[async_trait]
pub trait DivisionRaceProvider: Provider {
    /// Fetches standings for the requested divisions.
    async fn fetch_division_race(&self, query: &DivisionQuery)
    -> ProviderResult<DivisionRaceRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_names_match_serde() {
        for kind in ProviderKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_empty_stats_query() {
        let query = StatsQuery {
            season: 2025,
            pitcher_ids: Vec::new(),
            lineups: Lineups::default(),
        };
        assert!(query.is_empty());
    }
}
