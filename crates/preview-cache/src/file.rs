//! JSON file cache implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use preview_core::{
    CachedEntry, GameIdentity, PreviewError, Result, Snapshot, SnapshotCache,
    cache::sort_entries,
};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument, warn};

/// Distinguishes temporary files written concurrently by the same process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// The fields [`FileCache::list`] needs from each document.
#[derive(Deserialize)]
struct EntryHeader {
    identity: GameIdentity,
    fetched_at: DateTime<Utc>,
}

/// Cache storing one pretty-printed JSON document per game.
///
/// Documents are named after [`GameIdentity::cache_key`], e.g.
/// `NYY_BOS_2025-09-25.json`. Each write lands in a temporary file in the same
/// directory and is renamed over the target, so a reader never sees a
/// half-written document.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Create a file cache rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            PreviewError::CacheWrite(format!("Cannot create cache dir {}: {e}", dir.display()))
        })?;
        debug!(dir = %dir.display(), "File cache initialized");
        Ok(Self { dir })
    }

    /// The directory documents are stored in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `identity`.
    #[must_use]
    pub fn path_for(&self, identity: &GameIdentity) -> PathBuf {
        self.dir.join(format!("{}.json", identity.cache_key()))
    }

    fn temp_path_for(&self, identity: &GameIdentity) -> PathBuf {
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{seq}.tmp",
            identity.cache_key(),
            std::process::id()
        ))
    }
}

#[async_trait]
impl SnapshotCache for FileCache {
    #[instrument(skip(self, snapshot), fields(game = %identity))]
    async fn put(&self, identity: &GameIdentity, snapshot: &Snapshot) -> Result<()> {
        if snapshot.identity != *identity {
            return Err(PreviewError::InvalidParameter(format!(
                "Snapshot for {} cannot be stored under {identity}",
                snapshot.identity
            )));
        }

        let bytes = snapshot.to_json()?;
        let target = self.path_for(identity);
        let temp = self.temp_path_for(identity);

        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| PreviewError::CacheWrite(format!("{}: {e}", temp.display())))?;

        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(PreviewError::CacheWrite(format!(
                "{}: {e}",
                target.display()
            )));
        }

        debug!(path = %target.display(), bytes = bytes.len(), "Stored snapshot");
        Ok(())
    }

    #[instrument(skip(self), fields(game = %identity))]
    async fn get(&self, identity: &GameIdentity) -> Result<Snapshot> {
        let path = self.path_for(identity);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cached snapshot found");
                return Err(PreviewError::NotFound(identity.clone()));
            }
            Err(e) => {
                return Err(PreviewError::CacheRead(format!("{}: {e}", path.display())));
            }
        };
        Snapshot::from_json(&bytes)
    }

    async fn exists(&self, identity: &GameIdentity) -> Result<bool> {
        let path = self.path_for(identity);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| PreviewError::CacheRead(format!("{}: {e}", path.display())))
    }

    #[instrument(skip(self), fields(game = %identity))]
    async fn delete(&self, identity: &GameIdentity) -> Result<bool> {
        let path = self.path_for(identity);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted cached snapshot");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PreviewError::CacheWrite(format!("{}: {e}", path.display()))),
        }
    }

    async fn list(&self) -> Result<Vec<CachedEntry>> {
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| PreviewError::CacheRead(format!("{}: {e}", self.dir.display())))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| PreviewError::CacheRead(e.to_string()))?
        {
            let path = entry.path();
            let is_document = path.extension().is_some_and(|ext| ext == "json")
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_document {
                continue;
            }

            let header = match tokio::fs::read(&path).await {
                Ok(bytes) => serde_json::from_slice::<EntryHeader>(&bytes)
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match header {
                Ok(header) => entries.push(CachedEntry {
                    identity: header.identity,
                    fetched_at: header.fetched_at,
                }),
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "Skipping unreadable cache document"
                    );
                }
            }
        }

        sort_entries(&mut entries);
        Ok(entries)
    }
}
