//! Core data types for game previews.
//!
//! This module defines the normalized structures a [`Snapshot`](crate::Snapshot)
//! is made of:
//!
//! - [`GameIdentity`] - The cache key for one game
//! - [`GameInfo`] - Venue, start time and probable pitchers
//! - [`PitcherStats`] - A pitcher's season line
//! - [`BatterLine`] - A batter's season line
//! - [`PitchUsage`] - One pitch type in a pitcher's arsenal
//! - [`DivisionRace`] - Standings for one division

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{PreviewError, Result};
use crate::team::{Division, TeamCode, headshot_url};

/// An MLB Advanced Media player id.
pub type PlayerId = u64;

/// Identifies one game: away club, home club, date.
///
/// Two fetches for the same identity address the same cache entry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameIdentity {
    /// Visiting club.
    pub away_team: TeamCode,
    /// Home club.
    pub home_team: TeamCode,
    /// Local game date.
    pub game_date: NaiveDate,
}

impl GameIdentity {
    /// Creates an identity, validating both clubs.
    ///
    /// # Errors
    /// Returns [`PreviewError::InvalidParameter`] if a club is unknown or both
    /// sides are the same club.
    pub fn new(away_team: TeamCode, home_team: TeamCode, game_date: NaiveDate) -> Result<Self> {
        for code in [&away_team, &home_team] {
            if code.team().is_none() {
                return Err(PreviewError::InvalidParameter(format!(
                    "Unknown team code: {code}"
                )));
            }
        }
        if away_team == home_team {
            return Err(PreviewError::InvalidParameter(format!(
                "A club cannot play itself: {away_team}"
            )));
        }
        Ok(Self {
            away_team,
            home_team,
            game_date,
        })
    }

    /// Parses an identity from raw strings; the date must be `YYYY-MM-DD`.
    ///
    /// # Errors
    /// Returns [`PreviewError::InvalidParameter`] for unknown clubs or a bad date.
    pub fn parse(away_team: &str, home_team: &str, game_date: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(game_date, "%Y-%m-%d").map_err(|e| {
            PreviewError::InvalidParameter(format!("Invalid game date {game_date:?}: {e}"))
        })?;
        Self::new(TeamCode::new(away_team), TeamCode::new(home_team), date)
    }

    /// Deterministic cache key, e.g. `NYY_BOS_2025-09-25`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.away_team,
            self.home_team,
            self.game_date.format("%Y-%m-%d")
        )
    }

    /// The season the game belongs to.
    #[must_use]
    pub fn season(&self) -> i32 {
        self.game_date.year()
    }

    /// The divisions involved, away first, without duplicates.
    #[must_use]
    pub fn divisions(&self) -> Vec<Division> {
        let mut divisions = Vec::with_capacity(2);
        for code in [&self.away_team, &self.home_team] {
            if let Some(team) = code.team() {
                if !divisions.contains(&team.division) {
                    divisions.push(team.division);
                }
            }
        }
        divisions
    }
}

impl fmt::Display for GameIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} {}",
            self.away_team,
            self.home_team,
            self.game_date.format("%Y-%m-%d")
        )
    }
}

/// Caller-supplied starting pitcher ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitcherIds {
    /// Away starter.
    pub away: Option<PlayerId>,
    /// Home starter.
    pub home: Option<PlayerId>,
}

impl PitcherIds {
    /// Creates a pair of pitcher ids.
    #[must_use]
    pub const fn new(away: Option<PlayerId>, home: Option<PlayerId>) -> Self {
        Self { away, home }
    }

    /// Returns the known ids, away first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.away.into_iter().chain(self.home).collect();
        ids.dedup();
        ids
    }

    /// Returns true if neither side is known.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.away.is_none() && self.home.is_none()
    }
}

/// A pitcher reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitcherRef {
    /// Player id.
    pub id: PlayerId,
    /// Display name, when the upstream provided one.
    #[serde(default)]
    pub name: Option<String>,
}

/// Probable starters for both sides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbablePitchers {
    /// Away starter.
    #[serde(default)]
    pub away: Option<PitcherRef>,
    /// Home starter.
    #[serde(default)]
    pub home: Option<PitcherRef>,
}

impl ProbablePitchers {
    /// Returns the ids of the announced starters.
    #[must_use]
    pub fn ids(&self) -> PitcherIds {
        PitcherIds::new(
            self.away.as_ref().map(|p| p.id),
            self.home.as_ref().map(|p| p.id),
        )
    }

    /// Replaces starters with caller-supplied ids where given.
    ///
    /// A name is kept only when the override matches the announced starter.
    #[must_use]
    pub fn with_overrides(self, overrides: PitcherIds) -> Self {
        fn pick(announced: Option<PitcherRef>, id: Option<PlayerId>) -> Option<PitcherRef> {
            match (announced, id) {
                (Some(p), Some(id)) if p.id == id => Some(p),
                (_, Some(id)) => Some(PitcherRef { id, name: None }),
                (announced, None) => announced,
            }
        }
        Self {
            away: pick(self.away, overrides.away),
            home: pick(self.home, overrides.home),
        }
    }
}

/// A club's record going into the game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    /// Wins.
    pub wins: u32,
    /// Losses.
    pub losses: u32,
}

impl fmt::Display for TeamRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.wins, self.losses)
    }
}

/// Schedule-level information about the game.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    /// MLB game id.
    #[serde(default)]
    pub game_pk: Option<u64>,
    /// Ballpark name.
    pub venue: Option<String>,
    /// Scheduled first pitch.
    pub start_time: Option<DateTime<Utc>>,
    /// Upstream status (e.g., "Scheduled", "Final").
    #[serde(default)]
    pub status: Option<String>,
    /// Away club record.
    #[serde(default)]
    pub away_record: Option<TeamRecord>,
    /// Home club record.
    #[serde(default)]
    pub home_record: Option<TeamRecord>,
    /// Probable starters.
    #[serde(default)]
    pub probable_pitchers: ProbablePitchers,
}

/// A pitcher's season stat line.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PitcherStats {
    /// Player id.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Throwing hand ("R" or "L").
    #[serde(default)]
    pub hand: Option<String>,
    /// Wins.
    pub wins: Option<u32>,
    /// Losses.
    pub losses: Option<u32>,
    /// Earned run average.
    pub era: Option<f64>,
    /// Innings pitched.
    pub innings: Option<f64>,
    /// Walks plus hits per inning pitched.
    pub whip: Option<f64>,
    /// Strikeouts per nine innings.
    pub k_per_9: Option<f64>,
    /// Walks per nine innings.
    pub bb_per_9: Option<f64>,
    /// Home runs per nine innings.
    pub hr_per_9: Option<f64>,
    /// Fielding independent pitching.
    #[serde(default)]
    pub fip: Option<f64>,
    /// Wins above replacement.
    #[serde(default)]
    pub war: Option<f64>,
    /// Ground-ball rate, percent.
    #[serde(default)]
    pub gb_pct: Option<f64>,
}

/// A batter's season stat line.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatterLine {
    /// Player id.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Fielding position in this lineup.
    #[serde(default)]
    pub position: Option<String>,
    /// Age during the season.
    #[serde(default)]
    pub age: Option<u32>,
    /// Plate appearances.
    #[serde(default)]
    pub plate_appearances: Option<u32>,
    /// Batting average.
    pub avg: Option<f64>,
    /// On-base percentage.
    pub obp: Option<f64>,
    /// Slugging percentage.
    pub slg: Option<f64>,
    /// On-base plus slugging.
    pub ops: Option<f64>,
    /// Weighted runs created plus.
    #[serde(default)]
    pub wrc_plus: Option<f64>,
    /// Home runs.
    pub home_runs: Option<u32>,
    /// Runs batted in.
    pub rbi: Option<u32>,
    /// Stolen bases.
    pub stolen_bases: Option<u32>,
    /// Wins above replacement.
    #[serde(default)]
    pub war: Option<f64>,
}

impl BatterLine {
    /// Formats the AVG/OBP/SLG slash line, e.g. `.281/.390/.590`.
    #[must_use]
    pub fn slash_line(&self) -> String {
        fn rate(value: Option<f64>) -> String {
            match value {
                Some(v) => {
                    let thousandths = (v * 1000.0).round() as i64;
                    if thousandths >= 1000 {
                        format!("{}.{:03}", thousandths / 1000, thousandths % 1000)
                    } else {
                        format!(".{thousandths:03}")
                    }
                }
                None => "---".to_string(),
            }
        }
        format!("{}/{}/{}", rate(self.avg), rate(self.obp), rate(self.slg))
    }
}

/// Per-side values, away and home.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineups<T> {
    /// Away side, in batting order.
    #[serde(default = "Vec::new")]
    pub away: Vec<T>,
    /// Home side, in batting order.
    #[serde(default = "Vec::new")]
    pub home: Vec<T>,
}

impl<T> Default for Lineups<T> {
    fn default() -> Self {
        Self {
            away: Vec::new(),
            home: Vec::new(),
        }
    }
}

impl<T> Lineups<T> {
    /// Returns true if neither side has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.away.is_empty() && self.home.is_empty()
    }

    /// Total entries across both sides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.away.len() + self.home.len()
    }
}

/// One posted lineup slot, before stats are attached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupSlot {
    /// Player id.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Fielding position abbreviation.
    pub position: Option<String>,
}

/// One pitch type in a pitcher's arsenal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PitchUsage {
    /// Statcast pitch type code (e.g., "FF").
    pub code: String,
    /// Display name (e.g., "4-Seam FB").
    pub name: String,
    /// Number of tracked pitches.
    pub pitches: u32,
    /// Share of all tracked pitches, percent.
    pub usage_pct: f64,
    /// Mean release speed, mph.
    pub velocity: Option<f64>,
    /// Mean spin rate, rpm.
    #[serde(default)]
    pub spin_rate: Option<f64>,
    /// Whiffs per swing, percent.
    #[serde(default)]
    pub whiff_pct: Option<f64>,
}

/// One club's row in a division table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    /// Club.
    pub team: TeamCode,
    /// Wins.
    pub wins: u32,
    /// Losses.
    pub losses: u32,
    /// Games behind the division leader.
    pub games_back: f64,
}

/// Standings for one division, in rank order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DivisionRace {
    /// The division.
    pub division: Division,
    /// Rows, leader first.
    pub standings: Vec<StandingRow>,
}

/// Image links a preview renders alongside the data.
///
/// Built from static reference data, so it is filled in even when every
/// provider fails.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewAssets {
    /// Away club logo.
    #[serde(default)]
    pub away_logo: Option<String>,
    /// Home club logo.
    #[serde(default)]
    pub home_logo: Option<String>,
    /// Headshots keyed by player id, for starters and every pitcher with a line.
    #[serde(default)]
    pub headshots: BTreeMap<PlayerId, String>,
}

impl PreviewAssets {
    /// Club logos for both sides of `identity`. Headshots are added as pitchers
    /// become known.
    #[must_use]
    pub fn for_game(identity: &GameIdentity) -> Self {
        Self {
            away_logo: identity.away_team.team().map(|t| t.logo_url()),
            home_logo: identity.home_team.team().map(|t| t.logo_url()),
            headshots: BTreeMap::new(),
        }
    }

    /// Adds a headshot for `player` if one is not recorded yet.
    pub fn add_headshot(&mut self, player: PlayerId) {
        self.headshots
            .entry(player)
            .or_insert_with(|| headshot_url(player));
    }
}

/// Returns the display name for a Statcast pitch type code.
#[must_use]
pub fn pitch_name(code: &str) -> &str {
    match code {
        "FF" => "4-Seam FB",
        "SI" => "Sinker",
        "FC" => "Cutter",
        "SL" => "Slider",
        "ST" => "Sweeper",
        "SV" => "Slurve",
        "CU" => "Curveball",
        "KC" => "Knuckle Curve",
        "CH" => "Changeup",
        "FS" => "Splitter",
        "FO" => "Forkball",
        "KN" => "Knuckleball",
        "SC" => "Screwball",
        "EP" => "Eephus",
        "FA" => "Fastball",
        other => other,
    }
}
