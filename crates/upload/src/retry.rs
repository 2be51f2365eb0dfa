//! Bounded retries of single gateway operations.

use bzzup_gateway::GatewayError;
use std::{future::Future, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{Result, UploadError};

/// Fixed-delay retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(5),
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non transient error, or
/// the policy runs out of attempts.
///
/// `on_failure` sees every failed attempt with its 1-based number and
/// whether another attempt follows.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
    mut on_failure: impl FnMut(u32, &GatewayError, bool),
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, GatewayError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            outcome = operation() => outcome,
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => {
                on_failure(attempt, &e, false);
                return Err(UploadError::Rejected {
                    uploaded: 0,
                    source: e,
                });
            }
            Err(e) => e,
        };

        let retrying = attempt < max_attempts;
        warn!(attempt, max_attempts, error = %error, "Gateway operation failed");
        on_failure(attempt, &error, retrying);
        if !retrying {
            return Err(UploadError::RetriesExhausted {
                attempts: attempt,
                source: error,
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::time::Instant;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let start = Instant::now();
        let mut calls = 0;
        let mut failures = Vec::new();

        let value = with_retry(
            policy(10),
            &CancellationToken::new(),
            || {
                calls += 1;
                let fail = calls < 3;
                async move {
                    if fail {
                        Err(GatewayError::status(503, "busy"))
                    } else {
                        Ok(42)
                    }
                }
            },
            |attempt, _, retrying| failures.push((attempt, retrying)),
        )
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(failures, vec![(1, true), (2, true)]);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts() {
        let mut calls = 0;
        let err = with_retry(
            policy(3),
            &CancellationToken::new(),
            || {
                calls += 1;
                async { Err::<(), _>(GatewayError::status(500, "down")) }
            },
            |_, _, _| {},
        )
        .await
        .unwrap_err();

        assert_matches!(err, UploadError::RetriesExhausted { attempts: 3, .. });
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut calls = 0;
        let err = with_retry(
            policy(5),
            &CancellationToken::new(),
            || {
                calls += 1;
                async { Err::<(), _>(GatewayError::status(400, "bad request")) }
            },
            |_, _, retrying| assert!(!retrying),
        )
        .await
        .unwrap_err();

        assert_matches!(err, UploadError::Rejected { .. });
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_while_waiting() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let err = with_retry(
            policy(5),
            &cancel,
            || async { Err::<(), _>(GatewayError::status(503, "busy")) },
            |_, _, _| trigger.cancel(),
        )
        .await
        .unwrap_err();

        assert_matches!(err, UploadError::Cancelled);
    }
}
