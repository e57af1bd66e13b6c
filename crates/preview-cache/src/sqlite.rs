//! SQLite-based cache implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use preview_core::{
    CachedEntry, GameIdentity, PreviewError, Result, Snapshot, SnapshotCache, TeamCode,
    cache::sort_entries,
};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

fn read_err(e: impl ToString) -> PreviewError {
    PreviewError::CacheRead(e.to_string())
}

fn write_err(e: impl ToString) -> PreviewError {
    PreviewError::CacheWrite(e.to_string())
}

/// SQLite-based cache for snapshots.
///
/// This cache stores one row per game in a SQLite database file, providing
/// persistence across application restarts. `INSERT OR REPLACE` keeps the
/// one-entry-per-game rule, and SQLite's own transactions make each write atomic.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Create a new SQLite cache at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(write_err)?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory SQLite cache.
    ///
    /// Useful for testing; data is lost when the cache is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(write_err)?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(write_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS snapshots (
                cache_key TEXT PRIMARY KEY,
                away_team TEXT NOT NULL,
                home_team TEXT NOT NULL,
                game_date TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                data_json TEXT NOT NULL
            )",
            [],
        )
        .map_err(write_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_game_date ON snapshots(game_date)",
            [],
        )
        .map_err(write_err)?;

        debug!("SQLite cache schema initialized");
        Ok(())
    }
}

#[async_trait]
impl SnapshotCache for SqliteCache {
    #[instrument(skip(self, snapshot), fields(game = %identity))]
    async fn put(&self, identity: &GameIdentity, snapshot: &Snapshot) -> Result<()> {
        if snapshot.identity != *identity {
            return Err(PreviewError::InvalidParameter(format!(
                "Snapshot for {} cannot be stored under {identity}",
                snapshot.identity
            )));
        }
        let data_json = String::from_utf8(snapshot.to_json()?).map_err(write_err)?;

        let conn = self.conn.lock().map_err(write_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO snapshots
             (cache_key, away_team, home_team, game_date, fetched_at, data_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                identity.cache_key(),
                identity.away_team.as_str(),
                identity.home_team.as_str(),
                identity.game_date.to_string(),
                snapshot.fetched_at.to_rfc3339(),
                data_json,
            ],
        )
        .map_err(write_err)?;

        debug!("Stored snapshot");
        Ok(())
    }

    #[instrument(skip(self), fields(game = %identity))]
    async fn get(&self, identity: &GameIdentity) -> Result<Snapshot> {
        let conn = self.conn.lock().map_err(read_err)?;
        let data_json: Option<String> = conn
            .query_row(
                "SELECT data_json FROM snapshots WHERE cache_key = ?1",
                params![identity.cache_key()],
                |row| row.get(0),
            )
            .optional()
            .map_err(read_err)?;

        match data_json {
            Some(json) => Snapshot::from_json(json.as_bytes()),
            None => {
                debug!("No cached snapshot found");
                Err(PreviewError::NotFound(identity.clone()))
            }
        }
    }

    async fn exists(&self, identity: &GameIdentity) -> Result<bool> {
        let conn = self.conn.lock().map_err(read_err)?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM snapshots WHERE cache_key = ?1",
                params![identity.cache_key()],
                |row| row.get(0),
            )
            .map_err(read_err)?;
        Ok(count > 0)
    }

    #[instrument(skip(self), fields(game = %identity))]
    async fn delete(&self, identity: &GameIdentity) -> Result<bool> {
        let conn = self.conn.lock().map_err(write_err)?;
        let removed = conn
            .execute(
                "DELETE FROM snapshots WHERE cache_key = ?1",
                params![identity.cache_key()],
            )
            .map_err(write_err)?;
        debug!(removed, "Deleted cached snapshot");
        Ok(removed > 0)
    }

    async fn list(&self) -> Result<Vec<CachedEntry>> {
        let conn = self.conn.lock().map_err(read_err)?;
        let mut stmt = conn
            .prepare("SELECT away_team, home_team, game_date, fetched_at FROM snapshots")
            .map_err(read_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(read_err)?;

        let mut entries = Vec::new();
        for row in rows {
            match row.map_err(read_err).and_then(entry_from_row) {
                Ok(entry) => entries.push(entry),
                Err(error) => warn!(error = %error, "Skipping unreadable cache row"),
            }
        }

        sort_entries(&mut entries);
        Ok(entries)
    }
}

fn entry_from_row(
    (away, home, date, fetched_at): (String, String, String, String),
) -> Result<CachedEntry> {
    let game_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(read_err)?;
    let identity = GameIdentity::new(TeamCode::new(away), TeamCode::new(home), game_date)?;
    let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
        .map_err(read_err)?
        .with_timezone(&Utc);
    Ok(CachedEntry {
        identity,
        fetched_at,
    })
}
