#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/preview/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Fetch-and-cache orchestration for baseball game previews.
//!
//! This crate re-exports the core types and cache backends, provides the
//! [`FetchOrchestrator`] that writes snapshots and the [`SnapshotReader`] that
//! reads them back.
//!
//! # Features
//!
//! - `mlb` - MLB Stats API game info and standings clients
//! - `fangraphs` - FanGraphs sabermetric stats client
//! - `savant` - Baseball Savant pitch mix client
//! - `cache-sqlite` - SQLite-based caching
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use preview::{
//!     FetchOptions, FetchOrchestrator, FileCache, GameIdentity, PitcherIds, SnapshotReader,
//! };
//!
//! #[tokio::main]
//! async fn main() -> preview::Result<()> {
//!     let cache = Arc::new(FileCache::new("data/cache")?);
//!     let orchestrator = FetchOrchestrator::with_default_providers(cache.clone());
//!
//!     let identity = GameIdentity::parse("NYY", "BOS", "2025-09-25")?;
//!     orchestrator
//!         .fetch(&identity, PitcherIds::default(), &FetchOptions::default())
//!         .await?;
//!
//!     let snapshot = SnapshotReader::new(cache).load(&identity).await?;
//!     println!("{:?}", snapshot.source_status);
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use preview_core::*;

// Cache implementations
#[cfg(feature = "cache-sqlite")]
pub use preview_cache::SqliteCache;
pub use preview_cache::{FileCache, InMemoryCache};

// Providers
#[cfg(feature = "fangraphs")]
pub use preview_fangraphs::SabermetricStatsClient;
#[cfg(feature = "mlb")]
pub use preview_mlb::{DivisionRaceClient, GameInfoClient};
#[cfg(feature = "savant")]
pub use preview_savant::PitchMixClient;

mod orchestrator;
mod reader;
pub use orchestrator::{FetchOptions, FetchOrchestrator, Providers, UpstreamUrls};
pub use reader::SnapshotReader;
