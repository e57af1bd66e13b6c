#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/preview/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Snapshot cache backends.
//!
//! This crate provides implementations of the [`SnapshotCache`] trait from `preview-core`:
//!
//! - [`FileCache`] - One JSON document per game (default backend)
//! - [`SqliteCache`] - Single-table SQLite store (requires `sqlite` feature)
//! - [`InMemoryCache`] - Process-local cache for testing

/// JSON file cache implementation.
pub mod file;
/// In-memory cache implementation.
pub mod memory;

/// SQLite-based cache implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the trait for convenience
pub use preview_core::SnapshotCache;

// Re-export implementations
pub use file::FileCache;
pub use memory::InMemoryCache;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCache;
