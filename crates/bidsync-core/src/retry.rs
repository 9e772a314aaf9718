//! Retry-with-backoff combinator for transient store faults.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Backoff schedule: one delay per retry, so `delays.len()` is the maximum
/// number of retries after the first attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    /// Three retries after 1s, 2s and 3s.
    fn default() -> Self {
        Self::linear(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// `retries` delays growing linearly: `step`, `2*step`, ...
    pub fn linear(retries: u32, step: Duration) -> Self {
        Self {
            delays: (1..=retries).map(|n| step * n).collect(),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    pub fn max_retries(&self) -> usize {
        self.delays.len()
    }
}

/// Runs `op`, retrying while `is_retryable` accepts the error and the policy
/// has delays left. The last error is returned once retries are exhausted.
///
/// # Examples
///
/// ```
/// use bidsync_core::retry::{with_backoff, RetryPolicy};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut calls = 0;
/// let policy = RetryPolicy::linear(3, Duration::ZERO);
/// let result: Result<u32, String> = with_backoff(&policy, "demo", |_| true, || {
///     calls += 1;
///     let attempt = calls;
///     async move { if attempt < 3 { Err("locked".to_string()) } else { Ok(attempt) } }
/// })
/// .await;
/// assert_eq!(result, Ok(3));
/// # }
/// ```
pub async fn with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    operation: &str,
    is_retryable: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt = 0usize;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let Some(delay) = policy.delays.get(attempt).copied() else {
                    return Err(e);
                };
                if !is_retryable(&e) {
                    return Err(e);
                }
                attempt += 1;
                warn!(
                    operation,
                    attempt,
                    max_retries = policy.max_retries(),
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3)
            ]
        );
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(RetryPolicy::none().max_retries(), 0);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::linear(3, Duration::ZERO);
        let result: Result<&str, String> = with_backoff(
            &policy,
            "insert_project",
            |_| true,
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n <= 2 {
                        Err("lock timeout".to_string())
                    } else {
                        Ok("done")
                    }
                }
            },
        )
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::linear(3, Duration::ZERO);
        let result: Result<(), String> = with_backoff(
            &policy,
            "insert_project",
            |_| true,
            || {
                calls.set(calls.get() + 1);
                async { Err("lock timeout".to_string()) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::linear(3, Duration::ZERO);
        let result: Result<(), String> = with_backoff(
            &policy,
            "insert_project",
            |e: &String| e.contains("lock"),
            || {
                calls.set(calls.get() + 1);
                async { Err("unique violation".to_string()) }
            },
        )
        .await;
        assert_eq!(result, Err("unique violation".to_string()));
        assert_eq!(calls.get(), 1);
    }
}
