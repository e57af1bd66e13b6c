//! Read-only access to cached snapshots.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};

use preview_core::{GameIdentity, Result, Snapshot, SnapshotCache};

/// Loads snapshots for rendering.
///
/// The reader only ever talks to the cache. A game that was never fetched is
/// reported as [`PreviewError::NotFound`](preview_core::PreviewError::NotFound).
#[derive(Clone)]
pub struct SnapshotReader {
    cache: Arc<dyn SnapshotCache>,
}

impl fmt::Debug for SnapshotReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotReader")
            .field("cache", &"configured")
            .finish()
    }
}

impl SnapshotReader {
    /// Create a reader over `cache`.
    #[must_use]
    pub fn new(cache: Arc<dyn SnapshotCache>) -> Self {
        Self { cache }
    }

    /// Loads the cached snapshot for `identity`.
    ///
    /// # Errors
    /// Returns `NotFound` if the game has not been fetched, or `CacheRead` if
    /// the entry cannot be decoded.
    #[instrument(skip(self), fields(game = %identity))]
    pub async fn load(&self, identity: &GameIdentity) -> Result<Snapshot> {
        let snapshot = self.cache.get(identity).await?;
        debug!(
            fetched_at = %snapshot.fetched_at,
            complete = snapshot.is_complete(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Returns true if a snapshot is cached for `identity`.
    ///
    /// # Errors
    /// Returns an error if the cache cannot be queried.
    pub async fn exists(&self, identity: &GameIdentity) -> Result<bool> {
        self.cache.exists(identity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preview_cache::InMemoryCache;

    #[tokio::test]
    async fn test_unknown_game_is_not_found() {
        let reader = SnapshotReader::new(Arc::new(InMemoryCache::new()));
        let identity = GameIdentity::parse("SEA", "HOU", "2025-04-01").unwrap();

        assert!(!reader.exists(&identity).await.unwrap());
        let err = reader.load(&identity).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("run the fetch workflow first"));
    }
}
