#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/preview/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for game preview snapshots.
//!
//! This crate provides the foundational abstractions shared by every other crate:
//!
//! - [`GameIdentity`](types::GameIdentity) - The key a snapshot is stored under
//! - [`Snapshot`](snapshot::Snapshot) - Everything a preview renders from
//! - [`GameInfoProvider`](provider::GameInfoProvider),
//!   [`StatsProvider`](provider::StatsProvider),
//!   [`PitchMixProvider`](provider::PitchMixProvider),
//!   [`DivisionRaceProvider`](provider::DivisionRaceProvider) - Upstream capabilities
//! - [`SnapshotCache`](cache::SnapshotCache) - Storage abstraction
//! - [`RetryPolicy`](retry::RetryPolicy) - Bounded retries for provider calls

/// Cache trait for storing snapshots.
pub mod cache;
/// Error types for preview operations.
pub mod error;
/// Provider traits for fetching upstream data.
pub mod provider;
/// Retry policy for provider calls.
pub mod retry;
/// The persisted snapshot model.
pub mod snapshot;
/// Club and division reference data.
pub mod team;
/// Core data types (GameIdentity, PitcherStats, PitchUsage, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{CachedEntry, SnapshotCache};
pub use error::{
    FailureReason, PreviewError, ProviderFailure, ProviderResult, Result, parse_retry_after,
};
pub use provider::{
    DivisionQuery, DivisionRaceProvider, DivisionRaceRecord, GameInfoProvider, GameInfoRecord,
    GameQuery, PitchMixProvider, PitchMixQuery, PitchMixRecord, Provider, ProviderKind,
    StatsProvider, StatsQuery, StatsRecord,
};
pub use retry::RetryPolicy;
pub use snapshot::{Snapshot, SnapshotBuilder, SourceStatus};
pub use team::{Division, Team, TeamCode, headshot_url};
pub use types::{
    BatterLine, DivisionRace, GameIdentity, GameInfo, LineupSlot, Lineups, PitchUsage,
    PitcherIds, PitcherRef, PitcherStats, PlayerId, PreviewAssets, ProbablePitchers, StandingRow,
    TeamRecord, pitch_name,
};
