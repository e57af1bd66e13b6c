//! In-memory cache implementation.

use async_trait::async_trait;
use preview_core::{
    CachedEntry, GameIdentity, PreviewError, Result, Snapshot, SnapshotCache,
    cache::sort_entries,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Simple in-memory cache for testing and development.
///
/// Snapshots are held in their serialized form, so a round trip through this
/// cache exercises the same encoding as the persistent backends. Data is lost
/// when the cache is dropped.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<GameIdentity, Vec<u8>>>,
}

impl InMemoryCache {
    /// Create a new empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached snapshots.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotCache for InMemoryCache {
    #[instrument(skip(self, snapshot), fields(game = %identity))]
    async fn put(&self, identity: &GameIdentity, snapshot: &Snapshot) -> Result<()> {
        if snapshot.identity != *identity {
            return Err(PreviewError::InvalidParameter(format!(
                "Snapshot for {} cannot be stored under {identity}",
                snapshot.identity
            )));
        }
        let bytes = snapshot.to_json()?;
        self.entries.write().await.insert(identity.clone(), bytes);
        debug!("Stored snapshot");
        Ok(())
    }

    async fn get(&self, identity: &GameIdentity) -> Result<Snapshot> {
        let entries = self.entries.read().await;
        let bytes = entries
            .get(identity)
            .ok_or_else(|| PreviewError::NotFound(identity.clone()))?;
        Snapshot::from_json(bytes)
    }

    async fn exists(&self, identity: &GameIdentity) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(identity))
    }

    async fn delete(&self, identity: &GameIdentity) -> Result<bool> {
        Ok(self.entries.write().await.remove(identity).is_some())
    }

    async fn list(&self) -> Result<Vec<CachedEntry>> {
        let entries = self.entries.read().await;
        let mut listed = Vec::with_capacity(entries.len());
        for bytes in entries.values() {
            let snapshot = Snapshot::from_json(bytes)?;
            listed.push(CachedEntry {
                identity: snapshot.identity,
                fetched_at: snapshot.fetched_at,
            });
        }
        sort_entries(&mut listed);
        Ok(listed)
    }
}
