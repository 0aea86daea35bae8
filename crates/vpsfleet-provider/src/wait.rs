//! Bounded fixed-interval polling
//!
//! The single retry/timeout contract shared by job-completion waiting and
//! port-readiness waiting: probe at a fixed cadence, give up when the
//! deadline passes.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Poll `action` until it yields a value or `timeout` elapses.
///
/// The loop sleeps `interval` before each attempt, except while less than
/// half an interval has elapsed since the start — a caller whose first probe
/// is likely to succeed gets that answer without paying a full sleep up
/// front. The skipped first sleep is deliberate tuning, not an accident of
/// the loop shape.
///
/// `action` must settle promptly (one round of checks); the deadline is only
/// observed between attempts.
pub async fn poll_until<F, Fut, T>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut action: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    while start.elapsed() <= timeout {
        if start.elapsed() > interval / 2 {
            tokio::time::sleep(interval).await;
        }
        attempts += 1;
        if let Some(value) = action().await {
            debug!(what, attempts, "Poll condition met");
            return Ok(value);
        }
    }

    Err(Error::Timeout {
        what: what.to_string(),
        waited: timeout,
        detail: format!("gave up after {attempts} attempts"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const INTERVAL: Duration = Duration::from_millis(50);

    #[tokio::test(start_paused = true)]
    async fn immediate_hit_skips_the_first_sleep() {
        let start = Instant::now();
        let value = poll_until("ready", Duration::from_secs(5), INTERVAL, || async {
            Some(42)
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_the_condition_holds() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let value = poll_until("third try", Duration::from_secs(5), INTERVAL, || async move {
            // One round of probing takes a little while
            tokio::time::sleep(Duration::from_millis(20)).await;
            if calls.fetch_add(1, Ordering::SeqCst) >= 2 {
                Some("done")
            } else {
                None
            }
        })
        .await
        .unwrap();
        assert_eq!(value, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_the_condition_never_holds() {
        let start = Instant::now();
        let result: Result<()> =
            poll_until("nothing", Duration::from_millis(1000), INTERVAL, || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                None
            })
            .await;

        match result {
            Err(Error::Timeout { what, waited, .. }) => {
                assert_eq!(what, "nothing");
                assert_eq!(waited, Duration::from_millis(1000));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_attempts_after_the_grace_window() {
        let start = Instant::now();
        let calls = AtomicU32::new(0);
        let calls = &calls;
        // Each attempt consumes 30ms (> half the interval), so every attempt
        // after the first is preceded by a full interval sleep.
        poll_until("second try", Duration::from_secs(5), INTERVAL, || async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            if calls.fetch_add(1, Ordering::SeqCst) >= 1 {
                Some(())
            } else {
                None
            }
        })
        .await
        .unwrap();
        // attempt one (30ms) + interval sleep (50ms) + attempt two (30ms)
        assert_eq!(start.elapsed(), Duration::from_millis(110));
    }
}
