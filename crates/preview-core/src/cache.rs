//! Cache trait for storing assembled snapshots.
//!
//! This module defines the [`SnapshotCache`] trait that the orchestrator writes
//! through and the reader reads from. There is exactly one entry per
//! [`GameIdentity`]; a later write replaces the earlier one wholesale.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::Result, snapshot::Snapshot, types::GameIdentity};

/// Summary of one cache entry, as returned by [`SnapshotCache::list`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    /// The game the entry describes.
    pub identity: GameIdentity,
    /// When the snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
}

/// Durable storage of snapshots keyed by game identity.
///
/// Implementations must make `put` atomic with respect to `get`: a reader sees
/// either the previous snapshot or the new one, never a mix.
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Stores `snapshot`, replacing any entry for `identity`.
    async fn put(&self, identity: &GameIdentity, snapshot: &Snapshot) -> Result<()>;

    /// Loads the snapshot for `identity`.
    ///
    /// Returns [`PreviewError::NotFound`](crate::PreviewError::NotFound) if there is no entry.
    async fn get(&self, identity: &GameIdentity) -> Result<Snapshot>;

    /// Returns true if an entry exists for `identity`.
    async fn exists(&self, identity: &GameIdentity) -> Result<bool>;

    /// Removes the entry for `identity`. Returns true if one was removed.
    async fn delete(&self, identity: &GameIdentity) -> Result<bool>;

    /// Lists every entry, most recent game date first.
    async fn list(&self) -> Result<Vec<CachedEntry>>;
}

/// Sorts entries newest game first, then by identity for a stable order.
pub fn sort_entries(entries: &mut [CachedEntry]) {
    entries.sort_by(|a, b| {
        b.identity
            .game_date
            .cmp(&a.identity.game_date)
            .then_with(|| a.identity.cmp(&b.identity))
    });
}
