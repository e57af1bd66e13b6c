//! Bounded retry with per-attempt timeouts.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{FailureReason, ProviderFailure, ProviderResult};
use crate::provider::ProviderKind;

/// Upper bound on any single backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// How a provider call is retried.
///
/// A call makes at most `1 + max_retries` attempts. Each attempt is bounded by
/// `per_attempt_timeout`. Only transient failures are retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Timeout applied to each attempt.
    pub per_attempt_timeout: Duration,
    /// Base delay; attempt `n` waits `backoff * 2^n`, capped at [`MAX_BACKOFF`].
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            per_attempt_timeout: Duration::from_secs(30),
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (zero-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32, reason: &FailureReason) -> Duration {
        let exponential = self
            .backoff
            .saturating_mul(2u32.saturating_pow(retry))
            .min(MAX_BACKOFF);
        match reason {
            FailureReason::RateLimited {
                retry_after: Some(after),
            } => exponential.max(*after).min(MAX_BACKOFF),
            _ => exponential,
        }
    }

    /// Runs `op` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// An attempt that outlives `per_attempt_timeout` is dropped and counts as a
    /// [`FailureReason::Timeout`].
    ///
    /// # Errors
    /// Returns the last failure observed.
    pub async fn run<T, F, Fut>(&self, provider: ProviderKind, mut op: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut retry = 0;
        loop {
            let failure = match tokio::time::timeout(self.per_attempt_timeout, op()).await {
                Ok(Ok(value)) => {
                    if retry > 0 {
                        debug!(
                            provider = %provider,
                            attempts = retry + 1,
                            "Provider call succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Ok(Err(failure)) => failure,
                Err(_) => ProviderFailure::new(
                    provider,
                    FailureReason::Timeout(self.per_attempt_timeout),
                ),
            };

            if !failure.is_transient() || retry >= self.max_retries {
                return Err(failure);
            }

            let delay = self.delay_for(retry, &failure.reason);
            warn!(
                provider = %provider,
                attempt = retry + 1,
                max_attempts = self.max_retries + 1,
                delay_ms = delay.as_millis() as u64,
                reason = %failure.reason,
                "Provider call failed, retrying"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            per_attempt_timeout: Duration::from_millis(50),
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy {
            backoff: Duration::from_secs(1),
            ..Default::default()
        };
        let network = FailureReason::Network("reset".into());
        assert_eq!(policy.delay_for(0, &network), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2, &network), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10, &network), MAX_BACKOFF);

        let limited = FailureReason::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(policy.delay_for(0, &limited), Duration::from_secs(5));
        let limited_long = FailureReason::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert_eq!(policy.delay_for(0, &limited_long), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn test_timeout_is_retried_then_reported() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: ProviderResult<()> = fast_policy(1)
            .run(ProviderKind::PitchMix, || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let failure = result.unwrap_err();
        assert_eq!(failure.provider, ProviderKind::PitchMix);
        assert!(matches!(failure.reason, FailureReason::Timeout(_)));
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: ProviderResult<()> = fast_policy(3)
            .run(ProviderKind::Stats, || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ProviderFailure::new(
                        ProviderKind::Stats,
                        FailureReason::Malformed("unexpected column".into()),
                    ))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result.unwrap_err().reason,
            FailureReason::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result = fast_policy(2)
            .run(ProviderKind::GameInfo, || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ProviderFailure::new(
                            ProviderKind::GameInfo,
                            FailureReason::Network("503".into()),
                        ))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_retries_makes_one_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: ProviderResult<()> = fast_policy(0)
            .run(ProviderKind::DivisionRace, || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ProviderFailure::new(
                        ProviderKind::DivisionRace,
                        FailureReason::RateLimited { retry_after: None },
                    ))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
