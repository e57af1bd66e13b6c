//! Static club and division reference data.
//!
//! This is read-only data compiled into the binary. It is never fetched or cached.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PreviewError;
use crate::types::PlayerId;

/// An MLB division.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Division {
    /// American League East.
    AlEast,
    /// American League Central.
    AlCentral,
    /// American League West.
    AlWest,
    /// National League East.
    NlEast,
    /// National League Central.
    NlCentral,
    /// National League West.
    NlWest,
}

impl Division {
    /// Returns the MLB Stats API division id.
    #[must_use]
    pub const fn mlb_id(self) -> u32 {
        match self {
            Self::AlWest => 200,
            Self::AlEast => 201,
            Self::AlCentral => 202,
            Self::NlWest => 203,
            Self::NlEast => 204,
            Self::NlCentral => 205,
        }
    }

    /// Looks up a division by its MLB Stats API id.
    #[must_use]
    pub const fn from_mlb_id(id: u32) -> Option<Self> {
        match id {
            200 => Some(Self::AlWest),
            201 => Some(Self::AlEast),
            202 => Some(Self::AlCentral),
            203 => Some(Self::NlWest),
            204 => Some(Self::NlEast),
            205 => Some(Self::NlCentral),
            _ => None,
        }
    }

    /// Returns the MLB Stats API league id (103 for the AL, 104 for the NL).
    #[must_use]
    pub const fn league_id(self) -> u32 {
        match self {
            Self::AlEast | Self::AlCentral | Self::AlWest => 103,
            Self::NlEast | Self::NlCentral | Self::NlWest => 104,
        }
    }

    /// Returns the display name (e.g., "AL East").
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AlEast => "AL East",
            Self::AlCentral => "AL Central",
            Self::AlWest => "AL West",
            Self::NlEast => "NL East",
            Self::NlCentral => "NL Central",
            Self::NlWest => "NL West",
        }
    }

    /// Returns the clubs in this division.
    pub fn teams(self) -> impl Iterator<Item = &'static Team> {
        TEAMS.iter().filter(move |t| t.division == self)
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// One MLB club.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Team {
    /// Canonical abbreviation (e.g., "NYY").
    pub code: &'static str,
    /// MLB Stats API team id.
    pub mlb_id: u32,
    /// Full club name.
    pub name: &'static str,
    /// Division the club plays in.
    pub division: Division,
}

const fn team(code: &'static str, mlb_id: u32, name: &'static str, division: Division) -> Team {
    Team {
        code,
        mlb_id,
        name,
        division,
    }
}

/// All thirty clubs.
pub static TEAMS: [Team; 30] = [
    team("NYY", 147, "New York Yankees", Division::AlEast),
    team("BOS", 111, "Boston Red Sox", Division::AlEast),
    team("TB", 139, "Tampa Bay Rays", Division::AlEast),
    team("TOR", 141, "Toronto Blue Jays", Division::AlEast),
    team("BAL", 110, "Baltimore Orioles", Division::AlEast),
    team("CLE", 114, "Cleveland Guardians", Division::AlCentral),
    team("MIN", 142, "Minnesota Twins", Division::AlCentral),
    team("CWS", 145, "Chicago White Sox", Division::AlCentral),
    team("DET", 116, "Detroit Tigers", Division::AlCentral),
    team("KC", 118, "Kansas City Royals", Division::AlCentral),
    team("HOU", 117, "Houston Astros", Division::AlWest),
    team("TEX", 140, "Texas Rangers", Division::AlWest),
    team("SEA", 136, "Seattle Mariners", Division::AlWest),
    team("LAA", 108, "Los Angeles Angels", Division::AlWest),
    team("OAK", 133, "Athletics", Division::AlWest),
    team("ATL", 144, "Atlanta Braves", Division::NlEast),
    team("PHI", 143, "Philadelphia Phillies", Division::NlEast),
    team("NYM", 121, "New York Mets", Division::NlEast),
    team("MIA", 146, "Miami Marlins", Division::NlEast),
    team("WSH", 120, "Washington Nationals", Division::NlEast),
    team("MIL", 158, "Milwaukee Brewers", Division::NlCentral),
    team("STL", 138, "St. Louis Cardinals", Division::NlCentral),
    team("CHC", 112, "Chicago Cubs", Division::NlCentral),
    team("CIN", 113, "Cincinnati Reds", Division::NlCentral),
    team("PIT", 134, "Pittsburgh Pirates", Division::NlCentral),
    team("LAD", 119, "Los Angeles Dodgers", Division::NlWest),
    team("SD", 135, "San Diego Padres", Division::NlWest),
    team("SF", 137, "San Francisco Giants", Division::NlWest),
    team("COL", 115, "Colorado Rockies", Division::NlWest),
    team("ARI", 109, "Arizona Diamondbacks", Division::NlWest),
];

impl Team {
    /// Club logo on the MLB static asset host.
    #[must_use]
    pub fn logo_url(&self) -> String {
        format!("https://www.mlbstatic.com/team-logos/{}.svg", self.mlb_id)
    }
}

/// Player headshot on the MLB static asset host, which falls back to a
/// generic silhouette for unknown ids.
#[must_use]
pub fn headshot_url(player: PlayerId) -> String {
    format!(
        "https://img.mlbstatic.com/mlb-photos/image/upload/d_people:generic:headshot:67:current.png/w_213,q_auto:best/v1/people/{player}/headshot/67/current"
    )
}

/// Alternate abbreviations seen in upstream data.
const ALIASES: &[(&str, &str)] = &[
    ("CHW", "CWS"),
    ("KCR", "KC"),
    ("WSN", "WSH"),
    ("SDP", "SD"),
    ("SFG", "SF"),
    ("TBR", "TB"),
    ("AZ", "ARI"),
    ("ATH", "OAK"),
];

/// Looks up a club by its MLB Stats API team id.
#[must_use]
pub fn team_by_mlb_id(id: u32) -> Option<&'static Team> {
    TEAMS.iter().find(|t| t.mlb_id == id)
}

/// A club abbreviation.
///
/// Codes are upper-cased and common aliases are folded onto the canonical code on
/// creation. Use [`TeamCode::parse`] to also reject unknown clubs.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamCode(String);

impl TeamCode {
    /// Creates a normalized team code without checking it against the club table.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        let upper = code.into().trim().to_uppercase();
        let canonical = ALIASES
            .iter()
            .find(|(alias, _)| *alias == upper)
            .map_or(upper, |(_, canonical)| (*canonical).to_string());
        Self(canonical)
    }

    /// Creates a team code, rejecting clubs missing from the reference table.
    ///
    /// # Errors
    /// Returns [`PreviewError::InvalidParameter`] for an unknown club.
    pub fn parse(code: &str) -> Result<Self, PreviewError> {
        let code = Self::new(code);
        if code.team().is_none() {
            return Err(PreviewError::InvalidParameter(format!(
                "Unknown team code: {code}"
            )));
        }
        Ok(code)
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the reference entry for this club, if it is known.
    #[must_use]
    pub fn team(&self) -> Option<&'static Team> {
        TEAMS.iter().find(|t| t.code == self.0)
    }
}

impl fmt::Display for TeamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for TeamCode {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&'static Team> for TeamCode {
    fn from(team: &'static Team) -> Self {
        Self(team.code.to_string())
    }
}
