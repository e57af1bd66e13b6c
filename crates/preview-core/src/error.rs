//! Error types for preview operations.
//!
//! Two layers are defined here:
//!
//! - [`ProviderFailure`] is what a single upstream client returns. It is recorded
//!   in a snapshot's source status and never aborts sibling providers on its own.
//! - [`PreviewError`] is what callers of the orchestrator, the cache and the reader
//!   see.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::ProviderKind;
use crate::types::GameIdentity;

/// Why a provider call failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Connection failure or an upstream 5xx.
    Network(String),
    /// A single attempt exceeded its timeout.
    Timeout(Duration),
    /// The upstream rejected the request for rate-limit reasons.
    RateLimited {
        /// Suggested wait before the next request, if the upstream sent one.
        retry_after: Option<Duration>,
    },
    /// The upstream responded, but not with the expected schema.
    Malformed(String),
    /// The upstream responded without the requested data.
    MissingData(String),
    /// The orchestrator's overall deadline passed before the call resolved.
    DeadlineExceeded,
    /// The call was never issued because its query had nothing to ask.
    Skipped(String),
    /// The task running the call panicked or was cancelled.
    TaskFailed(String),
}

impl FailureReason {
    /// Returns true for failures worth retrying (network, timeout, rate limit).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited { .. }
        )
    }
}

impl FailureReason {
    /// Classifies a non-success HTTP status the same way for every client.
    ///
    /// 429 is a rate limit, 5xx is a network failure, 404 is missing data and
    /// anything else means the request or response was not what we expected.
    #[must_use]
    pub fn from_http_status(status: u16, retry_after: Option<Duration>) -> Self {
        match status {
            429 => Self::RateLimited { retry_after },
            500..=599 => Self::Network(format!("HTTP {status}")),
            404 => Self::MissingData(format!("HTTP {status}")),
            _ => Self::Malformed(format!("HTTP {status}")),
        }
    }
}

/// Parses a `Retry-After` header value given in whole seconds.
///
/// HTTP-date values are not supported and yield `None`.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Timeout(after) => write!(f, "timed out after {after:?}"),
            Self::RateLimited {
                retry_after: Some(after),
            } => write!(f, "rate limited, retry after {after:?}"),
            Self::RateLimited { retry_after: None } => write!(f, "rate limited"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
            Self::MissingData(msg) => write!(f, "missing data: {msg}"),
            Self::DeadlineExceeded => write!(f, "fetch deadline exceeded"),
            Self::Skipped(msg) => write!(f, "not requested: {msg}"),
            Self::TaskFailed(msg) => write!(f, "provider task failed: {msg}"),
        }
    }
}

/// A failed call to one provider.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{provider} provider failed: {reason}")]
pub struct ProviderFailure {
    /// The provider that failed.
    pub provider: ProviderKind,
    /// What went wrong.
    pub reason: FailureReason,
}

impl ProviderFailure {
    /// Creates a failure for `provider`.
    #[must_use]
    pub const fn new(provider: ProviderKind, reason: FailureReason) -> Self {
        Self { provider, reason }
    }

    /// Returns true if retrying the call could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.reason.is_transient()
    }
}

/// Errors surfaced to callers of the fetch and read paths.
#[derive(Error, Debug)]
pub enum PreviewError {
    /// No cache entry exists for the identity.
    #[error("No cached snapshot for {0}; run the fetch workflow first")]
    NotFound(GameIdentity),

    /// Every provider failed, so nothing was cached.
    #[error("All providers failed for {identity}: {}", join_failures(.failures))]
    FatalFetch {
        /// The game that was being fetched.
        identity: GameIdentity,
        /// One failure per provider queried.
        failures: Vec<ProviderFailure>,
    },

    /// The overall deadline passed before game info resolved.
    #[error("Fetch deadline exceeded for {identity} before game info resolved")]
    DeadlineExceeded {
        /// The game that was being fetched.
        identity: GameIdentity,
    },

    /// Writing a snapshot to the cache failed.
    #[error("Cache write error: {0}")]
    CacheWrite(String),

    /// Reading or decoding a cached snapshot failed.
    #[error("Cache read error: {0}")]
    CacheRead(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A provider failure surfaced outside of a fetch.
    #[error(transparent)]
    Provider(#[from] ProviderFailure),
}

impl PreviewError {
    /// Returns true if this is a cache miss rather than a real failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using [`PreviewError`].
pub type Result<T> = std::result::Result<T, PreviewError>;

/// Result type returned by provider clients.
pub type ProviderResult<T> = std::result::Result<T, ProviderFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FailureReason::Network("reset".into()).is_transient());
        assert!(FailureReason::Timeout(Duration::from_secs(1)).is_transient());
        assert!(FailureReason::RateLimited { retry_after: None }.is_transient());
        assert!(!FailureReason::Malformed("bad json".into()).is_transient());
        assert!(!FailureReason::MissingData("no game".into()).is_transient());
        assert!(!FailureReason::DeadlineExceeded.is_transient());
        assert!(!FailureReason::TaskFailed("panicked".into()).is_transient());
    }

    #[test]
    fn test_http_status_classification() {
        let after = Some(Duration::from_secs(7));
        assert_eq!(
            FailureReason::from_http_status(429, after),
            FailureReason::RateLimited { retry_after: after }
        );
        assert!(FailureReason::from_http_status(503, None).is_transient());
        assert!(matches!(
            FailureReason::from_http_status(404, None),
            FailureReason::MissingData(_)
        ));
        assert!(matches!(
            FailureReason::from_http_status(403, None),
            FailureReason::Malformed(_)
        ));
        assert_eq!(parse_retry_after(" 30 "), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_fatal_fetch_lists_every_failure() {
        let identity = GameIdentity::parse("NYY", "BOS", "2025-09-25").unwrap();
        let err = PreviewError::FatalFetch {
            identity,
            failures: vec![
                ProviderFailure::new(
                    ProviderKind::GameInfo,
                    FailureReason::Network("refused".into()),
                ),
                ProviderFailure::new(ProviderKind::PitchMix, FailureReason::DeadlineExceeded),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("NYY@BOS 2025-09-25"));
        assert!(msg.contains("game_info provider failed"));
        assert!(msg.contains("pitch_mix provider failed"));
    }
}
