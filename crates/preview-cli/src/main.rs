//! `game-preview`: fetch, cache and show baseball game previews.
//!
//! `fetch` is the only command that talks to upstream providers. `show` and
//! `list` read the cache and never touch the network.

#![forbid(unsafe_code)]

mod config;
mod render;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use preview::{
    FetchOrchestrator, FileCache, PitcherIds, Providers, SnapshotCache, SnapshotReader,
    SqliteCache,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{CacheBackend, Command, Config};

fn open_cache(config: &Config) -> anyhow::Result<Arc<dyn SnapshotCache>> {
    let cache: Arc<dyn SnapshotCache> = match config.cache_backend {
        CacheBackend::File => Arc::new(FileCache::new(&config.cache_dir)?),
        CacheBackend::Sqlite => {
            std::fs::create_dir_all(&config.cache_dir).with_context(|| {
                format!("creating cache directory {}", config.cache_dir.display())
            })?;
            Arc::new(SqliteCache::new(config.cache_dir.join("snapshots.db"))?)
        }
    };
    Ok(cache)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;

    let cache = open_cache(&config)?;
    info!(
        backend = ?config.cache_backend,
        dir = %config.cache_dir.display(),
        "Opened snapshot cache"
    );

    match &config.command {
        Command::Fetch {
            game,
            away_pitcher_id,
            home_pitcher_id,
            season,
            force,
        } => {
            let identity = game.identity()?;
            let orchestrator =
                FetchOrchestrator::new(Providers::upstream(&config.upstream_urls()), cache);
            let snapshot = orchestrator
                .fetch(
                    &identity,
                    PitcherIds::new(*away_pitcher_id, *home_pitcher_id),
                    &config.fetch_options(*season, *force),
                )
                .await?;
            print!("{}", render::render(&snapshot));
            let failed = snapshot.failed_providers();
            if !failed.is_empty() {
                let names: Vec<&str> = failed.iter().map(|kind| kind.as_str()).collect();
                eprintln!("warning: cached with degraded sources: {}", names.join(", "));
            }
        }
        Command::Show { game } => {
            let identity = game.identity()?;
            let snapshot = SnapshotReader::new(cache).load(&identity).await?;
            print!("{}", render::render(&snapshot));
        }
        Command::List => {
            let entries = cache.list().await?;
            if entries.is_empty() {
                println!("no cached games");
            }
            for entry in entries {
                println!(
                    "{:<22} fetched {}",
                    entry.identity.cache_key(),
                    entry.fetched_at.format("%Y-%m-%d %H:%M UTC")
                );
            }
        }
        Command::Invalidate { game } => {
            let identity = game.identity()?;
            if cache.delete(&identity).await? {
                println!("removed {}", identity.cache_key());
            } else {
                println!("nothing cached for {identity}");
            }
        }
    }
    Ok(())
}
