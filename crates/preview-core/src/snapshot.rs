//! The persisted snapshot model.
//!
//! A [`Snapshot`] is assembled by a [`SnapshotBuilder`] from the typed records the
//! providers return. Provider records never reach the cache directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{
    error::{PreviewError, ProviderFailure, ProviderResult, Result},
    provider::{DivisionRaceRecord, GameInfoRecord, PitchMixRecord, ProviderKind, StatsRecord},
    types::{
        BatterLine, DivisionRace, GameIdentity, GameInfo, Lineups, PitchUsage, PitcherIds,
        PitcherStats, PlayerId, PreviewAssets,
    },
};

/// Outcome of one provider within a fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Everything requested came back.
    Ok,
    /// Some requested players or divisions were missing.
    Partial,
    /// The provider failed; its fields are empty.
    Failed,
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Ok => "ok",
            Self::Partial => "partial",
            Self::Failed => "failed",
        })
    }
}

/// Everything needed to render one game preview.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The game this snapshot describes.
    pub identity: GameIdentity,
    /// When the providers were queried.
    pub fetched_at: DateTime<Utc>,
    /// Season the stats and pitch mix were pulled for; `0` in documents that
    /// predate the field.
    #[serde(default)]
    pub season: i32,
    /// Schedule metadata; `None` if the game info provider failed.
    #[serde(default)]
    pub game_info: Option<GameInfo>,
    /// Pitcher lines keyed by player id.
    #[serde(default)]
    pub pitcher_stats: BTreeMap<PlayerId, PitcherStats>,
    /// Pitch arsenals keyed by pitcher id.
    #[serde(default)]
    pub pitch_mix: BTreeMap<PlayerId, Vec<PitchUsage>>,
    /// Batter lines per side, in batting order.
    #[serde(default)]
    pub lineup_stats: Lineups<BatterLine>,
    /// Standings for each division involved, away club's first.
    #[serde(default)]
    pub division_race: Vec<DivisionRace>,
    /// Outcome per provider queried.
    pub source_status: BTreeMap<ProviderKind, SourceStatus>,
    /// Reason text for every provider that is not `ok`.
    #[serde(default)]
    pub source_errors: BTreeMap<ProviderKind, String>,
    /// Logo and headshot links from the static club table.
    #[serde(default)]
    pub assets: PreviewAssets,
}

impl Snapshot {
    /// Returns the recorded status for `kind`.
    #[must_use]
    pub fn status(&self, kind: ProviderKind) -> Option<SourceStatus> {
        self.source_status.get(&kind).copied()
    }

    /// Returns true if every provider returned everything requested.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        ProviderKind::ALL
            .iter()
            .all(|kind| self.status(*kind) == Some(SourceStatus::Ok))
    }

    /// Returns true if this snapshot answers a fetch for `pitchers` in `season`.
    ///
    /// Each side the caller names must match the recorded starter. A side left
    /// as `None` accepts whatever starter was announced.
    #[must_use]
    pub fn matches_request(&self, pitchers: PitcherIds, season: i32) -> bool {
        if self.season != season {
            return false;
        }
        let recorded = self
            .game_info
            .as_ref()
            .map(|game| game.probable_pitchers.ids())
            .unwrap_or_default();
        let side_matches =
            |wanted: Option<PlayerId>, got: Option<PlayerId>| wanted.is_none() || wanted == got;
        side_matches(pitchers.away, recorded.away) && side_matches(pitchers.home, recorded.home)
    }

    /// Returns true if the section backed by `kind` should be rendered as degraded.
    #[must_use]
    pub fn is_degraded(&self, kind: ProviderKind) -> bool {
        self.status(kind) != Some(SourceStatus::Ok)
    }

    /// Providers that failed outright.
    #[must_use]
    pub fn failed_providers(&self) -> Vec<ProviderKind> {
        self.source_status
            .iter()
            .filter(|(_, status)| **status == SourceStatus::Failed)
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Serializes to the cached document format (field-named JSON).
    ///
    /// # Errors
    /// Returns [`PreviewError::CacheWrite`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| PreviewError::CacheWrite(e.to_string()))
    }

    /// Deserializes a cached document.
    ///
    /// # Errors
    /// Returns [`PreviewError::CacheRead`] if the document is not a valid snapshot.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| PreviewError::CacheRead(e.to_string()))
    }
}

/// Merges provider outcomes into a [`Snapshot`].
///
/// Each provider must be recorded exactly once before [`build`](Self::build).
#[derive(Debug)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
    failures: Vec<ProviderFailure>,
}

impl SnapshotBuilder {
    /// Starts an empty snapshot for `identity`.
    #[must_use]
    pub fn new(identity: GameIdentity, fetched_at: DateTime<Utc>) -> Self {
        let assets = PreviewAssets::for_game(&identity);
        Self {
            snapshot: Snapshot {
                season: identity.season(),
                identity,
                fetched_at,
                game_info: None,
                pitcher_stats: BTreeMap::new(),
                pitch_mix: BTreeMap::new(),
                lineup_stats: Lineups::default(),
                division_race: Vec::new(),
                source_status: BTreeMap::new(),
                source_errors: BTreeMap::new(),
                assets,
            },
            failures: Vec::new(),
        }
    }

    /// Sets the season the dependent providers were queried for.
    pub fn season(&mut self, season: i32) -> &mut Self {
        self.snapshot.season = season;
        self
    }

    /// Records the game info outcome. Caller-supplied pitcher ids replace the
    /// announced starters.
    pub fn game_info(
        &mut self,
        outcome: ProviderResult<GameInfoRecord>,
        overrides: PitcherIds,
    ) -> &mut Self {
        match outcome {
            Ok(record) => {
                let mut game = record.game;
                game.probable_pitchers = game.probable_pitchers.with_overrides(overrides);
                self.snapshot.game_info = Some(game);
                self.mark(ProviderKind::GameInfo, SourceStatus::Ok, None);
            }
            Err(failure) => self.fail(failure),
        }
        self
    }

    /// Records the stats outcome.
    pub fn stats(&mut self, outcome: ProviderResult<StatsRecord>) -> &mut Self {
        match outcome {
            Ok(record) => {
                let detail = missing_detail("no stat line for players", &record.missing);
                self.snapshot.pitcher_stats = record.pitchers;
                self.snapshot.lineup_stats = record.lineups;
                self.mark_partial_if(ProviderKind::Stats, detail);
            }
            Err(failure) => self.fail(failure),
        }
        self
    }

    /// Records the pitch mix outcome.
    pub fn pitch_mix(&mut self, outcome: ProviderResult<PitchMixRecord>) -> &mut Self {
        match outcome {
            Ok(record) => {
                let detail = missing_detail("no tracked pitches for", &record.missing);
                self.snapshot.pitch_mix = record.arsenals;
                self.mark_partial_if(ProviderKind::PitchMix, detail);
            }
            Err(failure) => self.fail(failure),
        }
        self
    }

    /// Records the division race outcome.
    pub fn division_race(&mut self, outcome: ProviderResult<DivisionRaceRecord>) -> &mut Self {
        match outcome {
            Ok(record) => {
                let detail = (!record.missing.is_empty()).then(|| {
                    let names: Vec<&str> = record.missing.iter().map(|d| d.name()).collect();
                    format!("no standings for {}", names.join(", "))
                });
                self.snapshot.division_race = record.races;
                self.mark_partial_if(ProviderKind::DivisionRace, detail);
            }
            Err(failure) => self.fail(failure),
        }
        self
    }

    /// Failures recorded so far.
    #[must_use]
    pub fn failures(&self) -> &[ProviderFailure] {
        &self.failures
    }

    /// Finishes the snapshot.
    ///
    /// # Errors
    /// Returns [`PreviewError::FatalFetch`] if every provider failed, and
    /// [`PreviewError::InvalidParameter`] if a provider was never recorded.
    pub fn build(self) -> Result<Snapshot> {
        if let Some(kind) = ProviderKind::ALL
            .iter()
            .find(|kind| !self.snapshot.source_status.contains_key(*kind))
        {
            return Err(PreviewError::InvalidParameter(format!(
                "provider {kind} has no recorded outcome"
            )));
        }

        if self.failures.len() == ProviderKind::ALL.len() {
            return Err(PreviewError::FatalFetch {
                identity: self.snapshot.identity,
                failures: self.failures,
            });
        }

        let mut snapshot = self.snapshot;
        let starters = snapshot
            .game_info
            .as_ref()
            .map(|game| game.probable_pitchers.ids().to_vec())
            .unwrap_or_default();
        for id in starters.into_iter().chain(snapshot.pitcher_stats.keys().copied()) {
            snapshot.assets.add_headshot(id);
        }
        Ok(snapshot)
    }

    fn mark(&mut self, kind: ProviderKind, status: SourceStatus, detail: Option<String>) {
        self.snapshot.source_status.insert(kind, status);
        match detail {
            Some(detail) => {
                self.snapshot.source_errors.insert(kind, detail);
            }
            None => {
                self.snapshot.source_errors.remove(&kind);
            }
        }
    }

    fn mark_partial_if(&mut self, kind: ProviderKind, detail: Option<String>) {
        let status = if detail.is_some() {
            SourceStatus::Partial
        } else {
            SourceStatus::Ok
        };
        self.mark(kind, status, detail);
    }

    fn fail(&mut self, failure: ProviderFailure) {
        self.mark(
            failure.provider,
            SourceStatus::Failed,
            Some(failure.reason.to_string()),
        );
        self.failures.push(failure);
    }
}

fn missing_detail(prefix: &str, missing: &[PlayerId]) -> Option<String> {
    if missing.is_empty() {
        return None;
    }
    let ids: Vec<String> = missing.iter().map(ToString::to_string).collect();
    Some(format!("{prefix} {}", ids.join(", ")))
}
