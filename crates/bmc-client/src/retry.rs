//! # Exponential Backoff
//!
//! Bounded retry support for controller queries. Power-state reads go
//! through `query_with_retries` with a budget of 3 attempts and delays of
//! 2s, 4s between them; once the budget is exhausted the caller gets
//! `BmcError::Unreachable` instead of the transient error.

use crate::error::BmcError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry budget for power-state queries.
pub const QUERY_RETRY_BUDGET: u32 = 3;

/// Initial backoff delay between query attempts.
pub const QUERY_INITIAL_DELAY: Duration = Duration::from_secs(2);

/// Exponential backoff calculator
///
/// Each delay doubles the previous one, capped at `max`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    current: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    /// Create a new backoff starting at `initial` and capped at `max`.
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            current: initial,
            max,
        }
    }

    /// Get the next delay and advance the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = std::cmp::min(self.current.saturating_mul(2), self.max);
        delay
    }

    /// Reset the backoff to the initial state.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Run `op` up to `budget` times, sleeping with exponential backoff between
/// failed attempts. Exhausting the budget maps the last error into
/// `BmcError::Unreachable`.
pub(crate) async fn query_with_retries<T, F, Fut>(
    budget: u32,
    initial_delay: Duration,
    mut op: F,
) -> Result<T, BmcError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BmcError>>,
{
    let mut backoff = ExponentialBackoff::new(initial_delay, Duration::from_secs(60));
    let mut last_err = String::new();

    for attempt in 1..=budget {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(attempt, error = %err, "controller query failed");
                last_err = err.to_string();
                if attempt < budget {
                    tokio::time::sleep(backoff.next_delay()).await;
                }
            }
        }
    }

    Err(BmcError::Unreachable(last_err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(2), Duration::from_secs(10));

        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.next_delay(), Duration::from_secs(8));
        // 16s would exceed the cap
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(2), Duration::from_secs(10));

        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));

        backoff.reset();

        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhaust_to_unreachable() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), BmcError> =
            query_with_retries(3, Duration::from_millis(10), || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(BmcError::Connection("boom".to_string())) }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(BmcError::Unreachable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_succeed_after_transient_failure() {
        let attempts = AtomicU32::new(0);

        let result = query_with_retries(3, Duration::from_millis(10), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 1 {
                    Err(BmcError::Connection("flaky".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
