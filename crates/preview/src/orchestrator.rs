//! Fetch orchestration: providers in, one cached snapshot out.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, instrument, warn};

use preview_core::{
    DivisionQuery, DivisionRaceProvider, FailureReason, GameIdentity, GameInfoProvider, GameQuery,
    Lineups, PitchMixProvider, PitchMixQuery, PitcherIds, PreviewError, ProviderFailure,
    ProviderKind, ProviderResult, Result, RetryPolicy, Snapshot, SnapshotBuilder, SnapshotCache,
    StatsProvider, StatsQuery,
};

/// Knobs for one fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    /// Query providers even if a complete snapshot is already cached.
    pub force_refetch: bool,
    /// Timeout applied to each provider attempt.
    pub per_provider_timeout: Duration,
    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,
    /// Base backoff between attempts.
    pub retry_backoff: Duration,
    /// Wall-clock bound on the whole fetch.
    pub deadline: Duration,
    /// Season for stats and pitch mix; defaults to the game date's year.
    pub season: Option<i32>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            force_refetch: false,
            per_provider_timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            deadline: Duration::from_secs(120),
            season: None,
        }
    }
}

impl FetchOptions {
    /// The retry policy every provider call runs under.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            per_attempt_timeout: self.per_provider_timeout,
            backoff: self.retry_backoff,
        }
    }

    /// Checks that the timeouts can be met.
    ///
    /// # Errors
    /// Returns [`PreviewError::InvalidParameter`] for a zero timeout or deadline.
    pub fn validate(&self) -> Result<()> {
        if self.per_provider_timeout.is_zero() {
            return Err(PreviewError::InvalidParameter(
                "per-provider timeout must be greater than zero".to_string(),
            ));
        }
        if self.deadline.is_zero() {
            return Err(PreviewError::InvalidParameter(
                "fetch deadline must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Alternate upstream roots. `None` keeps each client's public default.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpstreamUrls {
    /// MLB Stats API root, e.g. `https://statsapi.mlb.com/api/v1`.
    pub mlb_api: Option<String>,
    /// FanGraphs site root.
    pub fangraphs: Option<String>,
    /// Baseball Savant site root.
    pub savant: Option<String>,
}

/// The four providers a snapshot is assembled from.
#[derive(Clone)]
pub struct Providers {
    /// Schedule and game metadata.
    pub game_info: Arc<dyn GameInfoProvider>,
    /// Sabermetric stat lines.
    pub stats: Arc<dyn StatsProvider>,
    /// Pitch arsenals.
    pub pitch_mix: Arc<dyn PitchMixProvider>,
    /// Division standings.
    pub division_race: Arc<dyn DivisionRaceProvider>,
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Providers")
            .field("game_info", &self.game_info.name())
            .field("stats", &self.stats.name())
            .field("pitch_mix", &self.pitch_mix.name())
            .field("division_race", &self.division_race.name())
            .finish()
    }
}

impl Providers {
    /// The public MLB Stats API, FanGraphs and Baseball Savant clients.
    #[cfg(all(feature = "mlb", feature = "fangraphs", feature = "savant"))]
    #[must_use]
    pub fn upstream(urls: &UpstreamUrls) -> Self {
        let mut game_info = preview_mlb::GameInfoClient::new();
        let mut division_race = preview_mlb::DivisionRaceClient::new();
        if let Some(url) = &urls.mlb_api {
            game_info = game_info.with_base_url(url.as_str());
            division_race = division_race.with_base_url(url.as_str());
        }

        let mut stats = preview_fangraphs::SabermetricStatsClient::new();
        if let Some(url) = &urls.fangraphs {
            stats = stats.with_base_url(url.as_str());
        }

        let mut pitch_mix = preview_savant::PitchMixClient::new();
        if let Some(url) = &urls.savant {
            pitch_mix = pitch_mix.with_base_url(url.as_str());
        }

        Self {
            game_info: Arc::new(game_info),
            stats: Arc::new(stats),
            pitch_mix: Arc::new(pitch_mix),
            division_race: Arc::new(division_race),
        }
    }
}

/// Fetches every provider for a game and writes the merged snapshot.
///
/// Game info runs first, since stats and pitch mix need the starters and
/// lineups it returns. The three dependent calls then run as concurrent tasks.
/// All four calls share one overall deadline.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use preview::{FetchOptions, FetchOrchestrator, FileCache, GameIdentity, PitcherIds};
///
/// let cache = Arc::new(FileCache::new("data/cache")?);
/// let orchestrator = FetchOrchestrator::with_default_providers(cache);
/// let identity = GameIdentity::parse("NYY", "BOS", "2025-09-25")?;
/// let snapshot = orchestrator
///     .fetch(&identity, PitcherIds::new(Some(573186), Some(676656)), &FetchOptions::default())
///     .await?;
/// ```
pub struct FetchOrchestrator {
    providers: Providers,
    cache: Arc<dyn SnapshotCache>,
}

impl fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("providers", &self.providers)
            .field("cache", &"configured")
            .finish()
    }
}

impl FetchOrchestrator {
    /// Create an orchestrator over the given providers and cache.
    #[must_use]
    pub fn new(providers: Providers, cache: Arc<dyn SnapshotCache>) -> Self {
        debug!(
            game_info = providers.game_info.name(),
            stats = providers.stats.name(),
            pitch_mix = providers.pitch_mix.name(),
            division_race = providers.division_race.name(),
            "Registering providers"
        );
        Self { providers, cache }
    }

    /// Create an orchestrator over the public upstream clients.
    #[cfg(all(feature = "mlb", feature = "fangraphs", feature = "savant"))]
    #[must_use]
    pub fn with_default_providers(cache: Arc<dyn SnapshotCache>) -> Self {
        Self::new(Providers::upstream(&UpstreamUrls::default()), cache)
    }

    /// The cache snapshots are written to.
    #[must_use]
    pub fn cache(&self) -> Arc<dyn SnapshotCache> {
        Arc::clone(&self.cache)
    }

    /// Fetches a snapshot for `identity` and writes it to the cache.
    ///
    /// Caller-supplied `pitchers` take precedence over the announced starters.
    /// Unless `options.force_refetch` is set, a cached snapshot whose providers
    /// all succeeded is returned without any provider call.
    ///
    /// # Errors
    ///
    /// - [`PreviewError::FatalFetch`] if every provider failed; nothing is written.
    /// - [`PreviewError::DeadlineExceeded`] if game info did not resolve in time.
    /// - [`PreviewError::CacheWrite`] if the snapshot could not be stored.
    /// - [`PreviewError::InvalidParameter`] for unusable options.
    #[instrument(skip(self, options), fields(game = %identity, force = options.force_refetch))]
    pub async fn fetch(
        &self,
        identity: &GameIdentity,
        pitchers: PitcherIds,
        options: &FetchOptions,
    ) -> Result<Snapshot> {
        options.validate()?;

        let season = options.season.unwrap_or_else(|| identity.season());

        if !options.force_refetch {
            match self.cache.get(identity).await {
                Ok(snapshot) if !snapshot.matches_request(pitchers, season) => {
                    debug!(
                        cached_season = snapshot.season,
                        "Cached snapshot was fetched for other pitchers or season, refetching"
                    );
                }
                Ok(snapshot) if snapshot.is_complete() => {
                    info!(fetched_at = %snapshot.fetched_at, "Using complete cached snapshot");
                    return Ok(snapshot);
                }
                Ok(_) => debug!("Cached snapshot is degraded, refetching"),
                Err(e) if e.is_not_found() => debug!("No cached snapshot, fetching"),
                Err(e) => warn!(error = %e, "Ignoring unreadable cached snapshot"),
            }
        }

        let deadline = Instant::now() + options.deadline;
        let policy = options.retry_policy();
        let fetched_at = Utc::now();

        let game_query = GameQuery {
            identity: identity.clone(),
        };
        let game_info = &self.providers.game_info;
        let game_outcome = timeout_at(
            deadline,
            policy.run(ProviderKind::GameInfo, || {
                game_info.fetch_game_info(&game_query)
            }),
        )
        .await
        .map_err(|_| {
            error!("Deadline exceeded before game info resolved");
            PreviewError::DeadlineExceeded {
                identity: identity.clone(),
            }
        })?;
        log_outcome(ProviderKind::GameInfo, &game_outcome);

        let (pitcher_ids, lineups) = match &game_outcome {
            Ok(record) => (
                record
                    .game
                    .probable_pitchers
                    .clone()
                    .with_overrides(pitchers)
                    .ids(),
                record.lineups.clone(),
            ),
            Err(_) => (pitchers, Lineups::default()),
        };

        let stats_query = StatsQuery {
            season,
            pitcher_ids: pitcher_ids.to_vec(),
            lineups,
        };
        let stats_task = (!stats_query.is_empty()).then(|| {
            let provider = Arc::clone(&self.providers.stats);
            spawn_call(policy, ProviderKind::Stats, async move {
                policy
                    .run(ProviderKind::Stats, || provider.fetch_stats(&stats_query))
                    .await
            })
        });

        let pitch_query = PitchMixQuery {
            season,
            through: identity.game_date,
            pitcher_ids: pitcher_ids.to_vec(),
        };
        let pitch_task = (!pitch_query.pitcher_ids.is_empty()).then(|| {
            let provider = Arc::clone(&self.providers.pitch_mix);
            spawn_call(policy, ProviderKind::PitchMix, async move {
                policy
                    .run(ProviderKind::PitchMix, || {
                        provider.fetch_pitch_mix(&pitch_query)
                    })
                    .await
            })
        });

        let division_query = DivisionQuery {
            season: identity.season(),
            date: identity.game_date,
            divisions: identity.divisions(),
        };
        let division_task = (!division_query.divisions.is_empty()).then(|| {
            let provider = Arc::clone(&self.providers.division_race);
            spawn_call(policy, ProviderKind::DivisionRace, async move {
                policy
                    .run(ProviderKind::DivisionRace, || {
                        provider.fetch_division_race(&division_query)
                    })
                    .await
            })
        });

        let stats_outcome = join_call(
            ProviderKind::Stats,
            stats_task,
            deadline,
            "no pitchers or lineups to look up",
        )
        .await;
        let pitch_outcome = join_call(
            ProviderKind::PitchMix,
            pitch_task,
            deadline,
            "no pitcher ids known",
        )
        .await;
        let division_outcome = join_call(
            ProviderKind::DivisionRace,
            division_task,
            deadline,
            "no divisions involved",
        )
        .await;

        let mut builder = SnapshotBuilder::new(identity.clone(), fetched_at);
        builder
            .season(season)
            .game_info(game_outcome, pitchers)
            .stats(stats_outcome)
            .pitch_mix(pitch_outcome)
            .division_race(division_outcome);

        let snapshot = match builder.build() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Fetch failed, cache left untouched");
                return Err(e);
            }
        };

        self.cache.put(identity, &snapshot).await?;
        info!(
            complete = snapshot.is_complete(),
            failed = ?snapshot.failed_providers(),
            "Snapshot cached"
        );
        Ok(snapshot)
    }
}

fn spawn_call<T, F>(
    policy: RetryPolicy,
    kind: ProviderKind,
    call: F,
) -> JoinHandle<ProviderResult<T>>
where
    T: Send + 'static,
    F: Future<Output = ProviderResult<T>> + Send + 'static,
{
    debug!(
        provider = %kind,
        max_attempts = policy.max_retries + 1,
        "Dispatching provider call"
    );
    tokio::spawn(call)
}

/// Waits for a dispatched call, or records why there was none.
///
/// A call still running at the deadline is aborted.
async fn join_call<T>(
    kind: ProviderKind,
    task: Option<JoinHandle<ProviderResult<T>>>,
    deadline: Instant,
    skipped: &str,
) -> ProviderResult<T> {
    let outcome = match task {
        None => Err(ProviderFailure::new(
            kind,
            FailureReason::Skipped(skipped.to_string()),
        )),
        Some(mut handle) => match timeout_at(deadline, &mut handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => Err(ProviderFailure::new(
                kind,
                FailureReason::TaskFailed(join_error.to_string()),
            )),
            Err(_) => {
                handle.abort();
                Err(ProviderFailure::new(kind, FailureReason::DeadlineExceeded))
            }
        },
    };
    log_outcome(kind, &outcome);
    outcome
}

fn log_outcome<T>(kind: ProviderKind, outcome: &ProviderResult<T>) {
    match outcome {
        Ok(_) => debug!(provider = %kind, "Provider succeeded"),
        Err(failure) => warn!(provider = %kind, reason = %failure.reason, "Provider failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use preview_cache::InMemoryCache;
    use preview_core::{
        CachedEntry, Division, DivisionRace, DivisionRaceRecord, GameInfo, GameInfoRecord,
        LineupSlot, PitchMixRecord, PitchUsage, PitcherRef, PitcherStats, ProbablePitchers,
        Provider, SourceStatus, StandingRow, StatsRecord, TeamCode,
    };

    use crate::SnapshotReader;

    /// Provider stand-in that counts calls and records the queries it saw.
    #[derive(Debug)]
    struct Stub<T> {
        outcome: ProviderResult<T>,
        delay: Duration,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl<T: Clone + Send + Sync + fmt::Debug> Stub<T> {
        fn ok(value: T) -> Arc<Self> {
            Self::with(Ok(value), Duration::ZERO)
        }

        fn failing(kind: ProviderKind, reason: FailureReason) -> Arc<Self> {
            Self::with(Err(ProviderFailure::new(kind, reason)), Duration::ZERO)
        }

        fn slow(value: T, delay: Duration) -> Arc<Self> {
            Self::with(Ok(value), delay)
        }

        fn with(outcome: ProviderResult<T>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                delay,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn answer(&self, query: &impl fmt::Debug) -> ProviderResult<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(format!("{query:?}"));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.clone()
        }
    }

    impl<T: Send + Sync + fmt::Debug> Provider for Stub<T> {
        fn name(&self) -> &str {
            "stub"
        }

        fn description(&self) -> &str {
            "test stub"
        }
    }

    #[async_trait]
    impl GameInfoProvider for Stub<GameInfoRecord> {
        async fn fetch_game_info(&self, query: &GameQuery) -> ProviderResult<GameInfoRecord> {
            self.answer(query).await
        }
    }

    #[async_trait]
    impl StatsProvider for Stub<StatsRecord> {
        async fn fetch_stats(&self, query: &StatsQuery) -> ProviderResult<StatsRecord> {
            self.answer(query).await
        }
    }

    #[async_trait]
    impl PitchMixProvider for Stub<PitchMixRecord> {
        async fn fetch_pitch_mix(&self, query: &PitchMixQuery) -> ProviderResult<PitchMixRecord> {
            self.answer(query).await
        }
    }

    #[async_trait]
    impl DivisionRaceProvider for Stub<DivisionRaceRecord> {
        async fn fetch_division_race(
            &self,
            query: &DivisionQuery,
        ) -> ProviderResult<DivisionRaceRecord> {
            self.answer(query).await
        }
    }

    /// Cache whose writes always fail.
    #[derive(Debug)]
    struct ReadOnlyCache;

    #[async_trait]
    impl SnapshotCache for ReadOnlyCache {
        async fn put(&self, _: &GameIdentity, _: &Snapshot) -> Result<()> {
            Err(PreviewError::CacheWrite("disk full".to_string()))
        }

        async fn get(&self, identity: &GameIdentity) -> Result<Snapshot> {
            Err(PreviewError::NotFound(identity.clone()))
        }

        async fn exists(&self, _: &GameIdentity) -> Result<bool> {
            Ok(false)
        }

        async fn delete(&self, _: &GameIdentity) -> Result<bool> {
            Ok(false)
        }

        async fn list(&self) -> Result<Vec<CachedEntry>> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        game_info: Arc<Stub<GameInfoRecord>>,
        stats: Arc<Stub<StatsRecord>>,
        pitch_mix: Arc<Stub<PitchMixRecord>>,
        division_race: Arc<Stub<DivisionRaceRecord>>,
        cache: Arc<InMemoryCache>,
    }

    impl Harness {
        fn healthy() -> Self {
            Self {
                game_info: Stub::ok(game_record()),
                stats: Stub::ok(stats_record()),
                pitch_mix: Stub::ok(pitch_record()),
                division_race: Stub::ok(division_record()),
                cache: Arc::new(InMemoryCache::new()),
            }
        }

        fn orchestrator(&self) -> FetchOrchestrator {
            self.orchestrator_with_cache(self.cache.clone())
        }

        fn orchestrator_with_cache(&self, cache: Arc<dyn SnapshotCache>) -> FetchOrchestrator {
            FetchOrchestrator::new(
                Providers {
                    game_info: self.game_info.clone(),
                    stats: self.stats.clone(),
                    pitch_mix: self.pitch_mix.clone(),
                    division_race: self.division_race.clone(),
                },
                cache,
            )
        }

        fn reader(&self) -> SnapshotReader {
            SnapshotReader::new(self.cache.clone())
        }

        fn total_calls(&self) -> usize {
            self.game_info.calls()
                + self.stats.calls()
                + self.pitch_mix.calls()
                + self.division_race.calls()
        }
    }

    fn identity() -> GameIdentity {
        GameIdentity::parse("NYY", "BOS", "2025-09-25").unwrap()
    }

    fn caller_pitchers() -> PitcherIds {
        PitcherIds::new(Some(573186), Some(676656))
    }

    fn fast_options() -> FetchOptions {
        FetchOptions {
            per_provider_timeout: Duration::from_millis(100),
            retry_backoff: Duration::from_millis(1),
            deadline: Duration::from_secs(5),
            ..Default::default()
        }
    }

    fn game_record() -> GameInfoRecord {
        GameInfoRecord {
            game: GameInfo {
                game_pk: Some(776142),
                venue: Some("Fenway Park".into()),
                probable_pitchers: ProbablePitchers {
                    away: Some(PitcherRef {
                        id: 573186,
                        name: Some("Marcus Stroman".into()),
                    }),
                    home: None,
                },
                ..Default::default()
            },
            lineups: Lineups {
                away: vec![LineupSlot {
                    player_id: 592450,
                    name: "Aaron Judge".into(),
                    position: Some("RF".into()),
                }],
                home: Vec::new(),
            },
        }
    }

    fn stats_record() -> StatsRecord {
        let mut record = StatsRecord::default();
        for (id, name) in [(573186, "Marcus Stroman"), (676656, "Brayan Bello")] {
            record.pitchers.insert(
                id,
                PitcherStats {
                    player_id: id,
                    name: name.into(),
                    era: Some(3.50),
                    ..Default::default()
                },
            );
        }
        record
    }

    fn pitch_record() -> PitchMixRecord {
        let mut record = PitchMixRecord::default();
        record.arsenals.insert(
            676656,
            vec![PitchUsage {
                code: "SI".into(),
                name: "Sinker".into(),
                pitches: 900,
                usage_pct: 38.5,
                velocity: Some(95.1),
                spin_rate: Some(2150.0),
                whiff_pct: Some(14.0),
            }],
        );
        record
    }

    fn division_record() -> DivisionRaceRecord {
        DivisionRaceRecord {
            races: vec![DivisionRace {
                division: Division::AlEast,
                standings: vec![StandingRow {
                    team: TeamCode::new("TOR"),
                    wins: 91,
                    losses: 67,
                    games_back: 0.0,
                }],
            }],
            missing: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_fetch_then_read_without_network() {
        let h = Harness::healthy();
        let snapshot = h
            .orchestrator()
            .fetch(&identity(), caller_pitchers(), &fast_options())
            .await
            .unwrap();

        assert!(snapshot.is_complete());
        assert_eq!(snapshot.source_status.len(), 4);
        assert!(snapshot.pitch_mix.contains_key(&676656));
        let starters = &snapshot.game_info.as_ref().unwrap().probable_pitchers;
        assert_eq!(starters.ids(), caller_pitchers());

        let seen = h.stats.seen.lock().unwrap().clone();
        assert!(seen[0].contains("573186") && seen[0].contains("676656"));
        assert!(seen[0].contains("592450"));

        let calls_after_fetch = h.total_calls();
        let reader = h.reader();
        assert!(reader.exists(&identity()).await.unwrap());
        assert_eq!(reader.load(&identity()).await.unwrap(), snapshot);
        assert_eq!(h.total_calls(), calls_after_fetch);
    }

    #[tokio::test]
    async fn test_pitch_mix_timeout_is_retried_once_and_recorded() {
        let mut h = Harness::healthy();
        h.pitch_mix = Stub::slow(pitch_record(), Duration::from_secs(2));
        let options = FetchOptions {
            max_retries: 1,
            ..fast_options()
        };

        let snapshot = h
            .orchestrator()
            .fetch(&identity(), caller_pitchers(), &options)
            .await
            .unwrap();

        assert_eq!(h.pitch_mix.calls(), 2);
        assert!(snapshot.pitch_mix.is_empty());
        assert_eq!(snapshot.status(ProviderKind::PitchMix), Some(SourceStatus::Failed));
        assert!(snapshot.source_errors[&ProviderKind::PitchMix].contains("timed out"));
        for kind in [ProviderKind::GameInfo, ProviderKind::Stats, ProviderKind::DivisionRace] {
            assert_eq!(snapshot.status(kind), Some(SourceStatus::Ok));
        }
        assert!(h.cache.exists(&identity()).await.unwrap());
    }

    #[tokio::test]
    async fn test_game_info_failure_still_uses_caller_pitchers() {
        let mut h = Harness::healthy();
        h.game_info = Stub::failing(
            ProviderKind::GameInfo,
            FailureReason::Malformed("unexpected schema".into()),
        );

        let snapshot = h
            .orchestrator()
            .fetch(&identity(), caller_pitchers(), &fast_options())
            .await
            .unwrap();

        assert_eq!(h.game_info.calls(), 1);
        assert!(snapshot.game_info.is_none());
        assert_eq!(snapshot.status(ProviderKind::GameInfo), Some(SourceStatus::Failed));
        assert_eq!(snapshot.status(ProviderKind::Stats), Some(SourceStatus::Ok));
        let seen = h.pitch_mix.seen.lock().unwrap().clone();
        assert!(seen[0].contains("573186") && seen[0].contains("676656"));
    }

    #[tokio::test]
    async fn test_dependent_calls_skipped_without_pitchers() {
        let mut h = Harness::healthy();
        h.game_info = Stub::failing(
            ProviderKind::GameInfo,
            FailureReason::MissingData("no game".into()),
        );

        let snapshot = h
            .orchestrator()
            .fetch(&identity(), PitcherIds::default(), &fast_options())
            .await
            .unwrap();

        assert_eq!(h.stats.calls(), 0);
        assert_eq!(h.pitch_mix.calls(), 0);
        assert_eq!(h.division_race.calls(), 1);
        assert_eq!(snapshot.status(ProviderKind::Stats), Some(SourceStatus::Failed));
        assert_eq!(snapshot.status(ProviderKind::DivisionRace), Some(SourceStatus::Ok));
        assert!(snapshot.source_errors[&ProviderKind::PitchMix].contains("not requested"));
    }

    #[tokio::test]
    async fn test_all_providers_failing_writes_nothing() {
        let h = Harness {
            game_info: Stub::failing(ProviderKind::GameInfo, FailureReason::Network("down".into())),
            stats: Stub::failing(ProviderKind::Stats, FailureReason::Network("down".into())),
            pitch_mix: Stub::failing(ProviderKind::PitchMix, FailureReason::Network("down".into())),
            division_race: Stub::failing(
                ProviderKind::DivisionRace,
                FailureReason::Network("down".into()),
            ),
            cache: Arc::new(InMemoryCache::new()),
        };
        let options = FetchOptions {
            max_retries: 0,
            ..fast_options()
        };

        let err = h
            .orchestrator()
            .fetch(&identity(), caller_pitchers(), &options)
            .await
            .unwrap_err();

        match err {
            PreviewError::FatalFetch { failures, .. } => assert_eq!(failures.len(), 4),
            other => panic!("expected FatalFetch, got {other:?}"),
        }
        assert!(!h.reader().exists(&identity()).await.unwrap());
    }

    #[tokio::test]
    async fn test_complete_cache_entry_short_circuits() {
        let h = Harness::healthy();
        let orchestrator = h.orchestrator();
        let first = orchestrator
            .fetch(&identity(), caller_pitchers(), &fast_options())
            .await
            .unwrap();
        let calls = h.total_calls();

        let second = orchestrator
            .fetch(&identity(), caller_pitchers(), &fast_options())
            .await
            .unwrap();
        assert_eq!(h.total_calls(), calls);
        assert_eq!(first, second);

        let forced = FetchOptions {
            force_refetch: true,
            ..fast_options()
        };
        orchestrator
            .fetch(&identity(), caller_pitchers(), &forced)
            .await
            .unwrap();
        assert_eq!(h.game_info.calls(), 2);
    }

    #[tokio::test]
    async fn test_degraded_cache_entry_is_refetched_and_replaced() {
        let mut h = Harness::healthy();
        h.pitch_mix = Stub::failing(
            ProviderKind::PitchMix,
            FailureReason::Malformed("bad csv".into()),
        );
        let degraded = h
            .orchestrator()
            .fetch(&identity(), caller_pitchers(), &fast_options())
            .await
            .unwrap();
        assert!(!degraded.is_complete());

        h.pitch_mix = Stub::ok(pitch_record());
        let repaired = h
            .orchestrator()
            .fetch(&identity(), caller_pitchers(), &fast_options())
            .await
            .unwrap();

        assert!(repaired.is_complete());
        assert_eq!(h.pitch_mix.calls(), 1);
        assert_eq!(h.cache.len().await, 1);
        assert_eq!(h.reader().load(&identity()).await.unwrap(), repaired);
    }

    #[tokio::test]
    async fn test_cached_entry_for_other_pitchers_or_season_is_refetched() {
        let h = Harness::healthy();
        let orchestrator = h.orchestrator();
        orchestrator
            .fetch(&identity(), caller_pitchers(), &fast_options())
            .await
            .unwrap();

        let scratched = PitcherIds::new(Some(111111), Some(222222));
        let snapshot = orchestrator
            .fetch(&identity(), scratched, &fast_options())
            .await
            .unwrap();
        assert_eq!(h.game_info.calls(), 2);
        let starters = &snapshot.game_info.as_ref().unwrap().probable_pitchers;
        assert_eq!(starters.ids(), scratched);
        let seen = h.pitch_mix.seen.lock().unwrap().clone();
        assert!(seen[1].contains("111111") && seen[1].contains("222222"));
        assert_eq!(h.reader().load(&identity()).await.unwrap(), snapshot);

        // Naming only the side that already matches is served from the cache.
        orchestrator
            .fetch(&identity(), PitcherIds::new(Some(111111), None), &fast_options())
            .await
            .unwrap();
        assert_eq!(h.game_info.calls(), 2);

        let last_season = FetchOptions {
            season: Some(2024),
            ..fast_options()
        };
        let snapshot = orchestrator
            .fetch(&identity(), scratched, &last_season)
            .await
            .unwrap();
        assert_eq!(h.game_info.calls(), 3);
        assert_eq!(snapshot.season, 2024);
        assert!(h.stats.seen.lock().unwrap()[2].contains("season: 2024"));
    }

    #[tokio::test]
    async fn test_refetch_replaces_cached_sections_instead_of_merging() {
        let mut h = Harness::healthy();
        let complete = h
            .orchestrator()
            .fetch(&identity(), caller_pitchers(), &fast_options())
            .await
            .unwrap();
        assert!(complete.pitch_mix.contains_key(&676656));

        h.pitch_mix = Stub::failing(
            ProviderKind::PitchMix,
            FailureReason::Malformed("bad csv".into()),
        );
        let forced = FetchOptions {
            force_refetch: true,
            ..fast_options()
        };
        h.orchestrator()
            .fetch(&identity(), caller_pitchers(), &forced)
            .await
            .unwrap();

        let stored = h.reader().load(&identity()).await.unwrap();
        assert!(stored.pitch_mix.is_empty());
        assert_eq!(stored.status(ProviderKind::PitchMix), Some(SourceStatus::Failed));
        assert_eq!(stored.status(ProviderKind::Stats), Some(SourceStatus::Ok));
        assert!(stored.fetched_at >= complete.fetched_at);
    }

    #[derive(Debug)]
    struct PanickingStats;

    impl Provider for PanickingStats {
        fn name(&self) -> &str {
            "panicking"
        }

        fn description(&self) -> &str {
            "stats provider that panics"
        }
    }

    #[async_trait]
    impl StatsProvider for PanickingStats {
        async fn fetch_stats(&self, _: &StatsQuery) -> ProviderResult<StatsRecord> {
            panic!("stats decoder bug");
        }
    }

    #[tokio::test]
    async fn test_panicking_provider_task_is_not_reported_as_network() {
        let h = Harness::healthy();
        let orchestrator = FetchOrchestrator::new(
            Providers {
                game_info: h.game_info.clone(),
                stats: Arc::new(PanickingStats),
                pitch_mix: h.pitch_mix.clone(),
                division_race: h.division_race.clone(),
            },
            h.cache.clone(),
        );

        let snapshot = orchestrator
            .fetch(&identity(), caller_pitchers(), &fast_options())
            .await
            .unwrap();

        assert_eq!(snapshot.status(ProviderKind::Stats), Some(SourceStatus::Failed));
        let reason = &snapshot.source_errors[&ProviderKind::Stats];
        assert!(reason.starts_with("provider task failed"), "{reason}");
        assert_eq!(snapshot.status(ProviderKind::PitchMix), Some(SourceStatus::Ok));
    }

    #[tokio::test]
    async fn test_deadline_abandons_slow_dependent_call() {
        let mut h = Harness::healthy();
        h.division_race = Stub::slow(division_record(), Duration::from_secs(30));
        let options = FetchOptions {
            per_provider_timeout: Duration::from_secs(60),
            deadline: Duration::from_millis(200),
            ..fast_options()
        };

        let started = std::time::Instant::now();
        let snapshot = h
            .orchestrator()
            .fetch(&identity(), caller_pitchers(), &options)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(
            snapshot.status(ProviderKind::DivisionRace),
            Some(SourceStatus::Failed)
        );
        assert!(snapshot.division_race.is_empty());
        assert_eq!(snapshot.status(ProviderKind::PitchMix), Some(SourceStatus::Ok));
    }

    #[tokio::test]
    async fn test_deadline_before_game_info_is_an_error() {
        let mut h = Harness::healthy();
        h.game_info = Stub::slow(game_record(), Duration::from_secs(30));
        let options = FetchOptions {
            per_provider_timeout: Duration::from_secs(60),
            deadline: Duration::from_millis(100),
            ..fast_options()
        };

        let err = h
            .orchestrator()
            .fetch(&identity(), caller_pitchers(), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, PreviewError::DeadlineExceeded { .. }));
        assert_eq!(h.stats.calls(), 0);
        assert!(!h.cache.exists(&identity()).await.unwrap());
    }

    #[tokio::test]
    async fn test_cache_write_failure_propagates() {
        let h = Harness::healthy();
        let err = h
            .orchestrator_with_cache(Arc::new(ReadOnlyCache))
            .fetch(&identity(), caller_pitchers(), &fast_options())
            .await
            .unwrap_err();
        assert!(matches!(err, PreviewError::CacheWrite(_)));
    }

    #[tokio::test]
    async fn test_zero_deadline_is_rejected() {
        let h = Harness::healthy();
        let options = FetchOptions {
            deadline: Duration::ZERO,
            ..fast_options()
        };
        let err = h
            .orchestrator()
            .fetch(&identity(), caller_pitchers(), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, PreviewError::InvalidParameter(_)));
        assert_eq!(h.total_calls(), 0);
    }

    #[test]
    fn test_default_options() {
        let options = FetchOptions::default();
        assert!(!options.force_refetch);
        assert_eq!(options.retry_policy().max_retries, 2);
        assert_eq!(options.per_provider_timeout, Duration::from_secs(30));
    }
}
