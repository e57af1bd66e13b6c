use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use preview::{FetchOptions, GameIdentity, UpstreamUrls};

/// Fetch, cache and show baseball game previews
#[derive(Parser, Debug, Clone)]
#[command(name = "game-preview", version, about)]
pub(crate) struct Config {
    /// Directory holding cached snapshots
    #[arg(long, env = "PREVIEW_CACHE_DIR", default_value = "data/cache", global = true)]
    pub(crate) cache_dir: PathBuf,

    /// Cache storage backend
    #[arg(
        long,
        env = "PREVIEW_CACHE_BACKEND",
        value_enum,
        default_value = "file",
        global = true
    )]
    pub(crate) cache_backend: CacheBackend,

    /// MLB Stats API root (defaults to the public API)
    #[arg(long, env = "PREVIEW_MLB_API_URL", global = true)]
    pub(crate) mlb_api_url: Option<String>,

    /// FanGraphs site root
    #[arg(long, env = "PREVIEW_FANGRAPHS_URL", global = true)]
    pub(crate) fangraphs_url: Option<String>,

    /// Baseball Savant site root
    #[arg(long, env = "PREVIEW_SAVANT_URL", global = true)]
    pub(crate) savant_url: Option<String>,

    /// Timeout for each provider attempt, in seconds
    #[arg(long, env = "PREVIEW_TIMEOUT_SECS", default_value = "30", global = true)]
    pub(crate) timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[arg(long, env = "PREVIEW_MAX_RETRIES", default_value = "2", global = true)]
    pub(crate) max_retries: u32,

    /// Base delay between retries, in milliseconds
    #[arg(long, env = "PREVIEW_RETRY_BACKOFF_MS", default_value = "500", global = true)]
    pub(crate) retry_backoff_ms: u64,

    /// Wall-clock bound on a whole fetch, in seconds
    #[arg(long, env = "PREVIEW_DEADLINE_SECS", default_value = "120", global = true)]
    pub(crate) deadline_secs: u64,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Query every provider for a game and cache the snapshot
    Fetch {
        #[command(flatten)]
        game: GameArgs,

        /// Away starter's MLBAM id, overriding the announced starter
        #[arg(long)]
        away_pitcher_id: Option<u64>,

        /// Home starter's MLBAM id, overriding the announced starter
        #[arg(long)]
        home_pitcher_id: Option<u64>,

        /// Season for stats and pitch mix (defaults to the game's year)
        #[arg(long)]
        season: Option<i32>,

        /// Refetch even if a complete snapshot is cached
        #[arg(long)]
        force: bool,
    },
    /// Render a cached snapshot
    Show {
        #[command(flatten)]
        game: GameArgs,
    },
    /// List cached games, newest first
    List,
    /// Remove a cached snapshot
    Invalidate {
        #[command(flatten)]
        game: GameArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub(crate) struct GameArgs {
    /// Away club abbreviation (e.g. NYY)
    pub(crate) away: String,
    /// Home club abbreviation (e.g. BOS)
    pub(crate) home: String,
    /// Game date, YYYY-MM-DD
    pub(crate) date: String,
}

impl GameArgs {
    pub(crate) fn identity(&self) -> preview::Result<GameIdentity> {
        GameIdentity::parse(&self.away, &self.home, &self.date)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheBackend {
    /// One JSON document per game
    File,
    /// Single SQLite database in the cache directory
    Sqlite,
}

impl Config {
    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.deadline_secs == 0 {
            anyhow::bail!("deadline_secs must be greater than zero");
        }
        if self.max_retries > 10 {
            anyhow::bail!("max_retries must be at most 10");
        }
        if let Command::Fetch {
            away_pitcher_id,
            home_pitcher_id,
            ..
        } = &self.command
        {
            if away_pitcher_id.is_some() && away_pitcher_id == home_pitcher_id {
                anyhow::bail!("away and home pitcher ids must differ");
            }
        }
        Ok(())
    }

    pub(crate) fn upstream_urls(&self) -> UpstreamUrls {
        UpstreamUrls {
            mlb_api: self.mlb_api_url.clone(),
            fangraphs: self.fangraphs_url.clone(),
            savant: self.savant_url.clone(),
        }
    }

    pub(crate) fn fetch_options(&self, season: Option<i32>, force: bool) -> FetchOptions {
        FetchOptions {
            force_refetch: force,
            per_provider_timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            deadline: Duration::from_secs(self.deadline_secs),
            season,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_args_parse() {
        let config = Config::try_parse_from([
            "game-preview",
            "fetch",
            "NYY",
            "BOS",
            "2025-09-25",
            "--away-pitcher-id",
            "573186",
            "--home-pitcher-id",
            "676656",
            "--max-retries",
            "1",
        ])
        .unwrap();
        config.validate().unwrap();

        let Command::Fetch {
            game,
            away_pitcher_id,
            force,
            ..
        } = &config.command
        else {
            panic!("expected fetch");
        };
        assert_eq!(game.identity().unwrap().cache_key(), "NYY_BOS_2025-09-25");
        assert_eq!(*away_pitcher_id, Some(573186));
        assert!(!force);

        let options = config.fetch_options(None, true);
        assert_eq!(options.max_retries, 1);
        assert!(options.force_refetch);
        assert_eq!(options.deadline, Duration::from_secs(120));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let config = Config::try_parse_from([
            "game-preview",
            "list",
            "--cache-backend",
            "sqlite",
            "--cache-dir",
            "/tmp/previews",
        ])
        .unwrap();
        assert_eq!(config.cache_backend, CacheBackend::Sqlite);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/previews"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config =
            Config::try_parse_from(["game-preview", "--timeout-secs", "0", "list"]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_same_pitcher_twice() {
        let config = Config::try_parse_from([
            "game-preview",
            "fetch",
            "NYY",
            "BOS",
            "2025-09-25",
            "--away-pitcher-id",
            "1",
            "--home-pitcher-id",
            "1",
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }
}
