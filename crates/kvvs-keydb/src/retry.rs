//! Bounded retry loop for optimistic (WATCH/MULTI/EXEC) transactions.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;

/// How often an aborted transaction is re-run, and how long to wait between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never below one.
    pub max_attempts: u32,
    /// Base delay; the wait after attempt `n` is `backoff * n`.
    pub backoff: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Wait after the `attempt`-th abort. Saturates instead of overflowing.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }

    /// Drive `attempt` until it yields a value, fails, or the ceiling is reached.
    ///
    /// Each round first calls `connect`, then hands the connection to
    /// `attempt`. `Ok(None)` from `attempt` means the transaction aborted
    /// because a watched key changed, and the round is repeated.
    ///
    /// # Errors
    /// Propagates errors from `connect` and `attempt`. Returns
    /// `RetriesExhausted` after `max_attempts` aborted rounds.
    pub async fn run<C, T, Conn, ConnFut, F, Fut>(
        &self,
        key: &str,
        mut connect: Conn,
        mut attempt: F,
    ) -> Result<T>
    where
        Conn: FnMut() -> ConnFut,
        ConnFut: Future<Output = Result<C>>,
        F: FnMut(C) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        for n in 1..=self.max_attempts {
            let con = connect().await?;
            if let Some(done) = attempt(con).await? {
                return Ok(done);
            }
            if n < self.max_attempts {
                debug!(key, attempt = n, "optimistic transaction aborted, retrying");
                tokio::time::sleep(self.delay(n)).await;
            }
        }
        Err(kvvs_core::Error::RetriesExhausted {
            key: key.to_owned(),
            attempts: self.max_attempts,
        }
        .into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use kvvs_core::ErrorKind;

    use super::*;
    use crate::error::Error;

    async fn connected() -> Result<()> {
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(4, Duration::from_millis(10));
        let calls = Cell::new(0_u32);
        let started = tokio::time::Instant::now();

        let err = policy
            .run(
                "branch:r:main",
                connected,
                |()| {
                    calls.set(calls.get() + 1);
                    async { Ok(None::<()>) }
                },
            )
            .await
            .unwrap_err();

        assert_eq!(calls.get(), 4);
        match kvvs_core::Error::from(err) {
            kvvs_core::Error::RetriesExhausted { key, attempts } => {
                assert_eq!(key, "branch:r:main");
                assert_eq!(attempts, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Linear backoff between rounds, no wait after the last one: 10 + 20 + 30 ms.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(60), "waited {waited:?}");
        assert!(waited < Duration::from_millis(100), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_later_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let calls = Cell::new(0_u32);

        let value = policy
            .run("tag:r:v1", connected, |()| {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { Ok((n == 3).then_some(n)) }
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_attempt_error_stops_retrying() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let calls = Cell::new(0_u32);

        let err = policy
            .run("author:r:a", connected, |()| {
                calls.set(calls.get() + 1);
                async { Err::<Option<()>, _>(kvvs_core::Error::conflict("author", "a").into()) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.get(), 1);
        assert_eq!(kvvs_core::Error::from(err).kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_connect_error_is_returned() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let err = policy
            .run(
                "branch:r:main",
                || async { Err::<(), _>(Error::from(kvvs_core::Error::Timeout(Duration::from_secs(1)))) },
                |()| async { Ok(Some(())) },
            )
            .await
            .unwrap_err();
        assert_eq!(kvvs_core::Error::from(err).kind(), ErrorKind::Transient);
    }

    #[test]
    fn test_delay_is_linear_and_saturates() {
        let policy = RetryPolicy::new(0, Duration::from_millis(5));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delay(3), Duration::from_millis(15));

        let huge = RetryPolicy::new(3, Duration::MAX);
        assert_eq!(huge.delay(2), Duration::MAX);
    }
}
