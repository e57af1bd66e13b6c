#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/preview/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! MLB Stats API clients.
//!
//! This crate provides two clients that implement capability traits from
//! `preview-core`:
//!
//! - [`GameInfoClient`] - [`GameInfoProvider`](preview_core::GameInfoProvider)
//! - [`DivisionRaceClient`] - [`DivisionRaceProvider`](preview_core::DivisionRaceProvider)
//!
//! # Example
//!
//! ```no_run
//! use preview_core::{GameIdentity, GameInfoProvider, GameQuery};
//! use preview_mlb::GameInfoClient;
//!
//! # async fn example() -> preview_core::Result<()> {
//! let client = GameInfoClient::new();
//! let identity = GameIdentity::parse("NYY", "BOS", "2025-09-25")?;
//! let record = client.fetch_game_info(&GameQuery { identity }).await?;
//! println!("Venue: {:?}", record.game.venue);
//! # Ok(())
//! # }
//! ```

mod http;
/// Schedule client.
pub mod schedule;
/// Standings client.
pub mod standings;

pub use schedule::GameInfoClient;
pub use standings::DivisionRaceClient;

/// MLB Stats API base URL.
pub const DEFAULT_BASE_URL: &str = "https://statsapi.mlb.com/api/v1";
