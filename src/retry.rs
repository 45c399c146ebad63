//! Fixed-delay retry for connection establishment.

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::PipelineError;

/// How often and how long to keep trying a store that is not ready yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// `None` retries until the process is killed.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            max_attempts: Some(600),
        }
    }
}

/// Calls `connect` until it succeeds, sleeping `policy.delay` after every
/// transient failure. Non-transient errors and the last error once the
/// attempt cap is reached are returned as is.
pub async fn with_retry<T, F, Fut>(
    target: &str,
    policy: &RetryPolicy,
    mut connect: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match connect().await {
            Ok(value) => {
                info!(target_store = target, attempt, "Connection successful");
                return Ok(value);
            }
            Err(e) if e.is_transient() => {
                if policy.max_attempts.is_some_and(|max| attempt >= max) {
                    warn!(target_store = target, attempt, error = %e, "Giving up on connection");
                    return Err(e);
                }
                warn!(
                    target_store = target,
                    attempt,
                    retry_in_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "Connection attempt failed"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_millis(1),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_retries_until_ready() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let value = with_retry("source", &quick(None), || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(PipelineError::unavailable("source", "not yet"))
            } else {
                Ok(42)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_stops_at_attempt_cap() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry("sink", &quick(Some(3)), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::unavailable("sink", "refused"))
        })
        .await;

        assert!(matches!(
            result,
            Err(PipelineError::ConnectionUnavailable { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry("source", &quick(None), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::Schema("no location column".into()))
        })
        .await;

        assert!(matches!(result, Err(PipelineError::Schema(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
