//! A single retry primitive used by every writer: a bounded backoff schedule that
//! treats all non-cancellation errors as retriable, grounded on the original
//! `RetryWithBackoff` helper's delay table.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Delay before each retry attempt. The schedule flattens out at 10s rather than
/// growing unbounded, so a persistently-down store is retried steadily instead of
/// backing off for minutes.
const DELAYS: &[Duration] = &[
    Duration::from_millis(100),
    Duration::from_millis(400),
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(5),
    Duration::from_secs(10),
];

/// Runs `op` up to `max_retries + 1` times, sleeping the schedule in [`DELAYS`] between
/// attempts (the delay after the schedule is exhausted stays at its last entry).
/// Returns early with [`RetryError::Cancelled`] if `cancel` fires while waiting or
/// between attempts.
pub async fn retry_with_backoff<T, E, F, Fut>(
    cancel: &CancellationToken,
    max_retries: usize,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_retries {
                    return Err(RetryError::Exhausted(err));
                }

                let delay = DELAYS.get(attempt).copied().unwrap_or(*DELAYS.last().unwrap());
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                }
                attempt += 1;
            }
        }
    }
}

/// Error returned by [`retry_with_backoff`].
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("retry cancelled")]
    Cancelled,

    #[error("retries exhausted: {0}")]
    Exhausted(E),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn succeeds_without_retrying_on_first_try() {
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);

        let result: Result<_, RetryError<&str>> = retry_with_backoff(&cancel, 5, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, &str>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);

        let result = retry_with_backoff(&cancel, 5, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 { Err("not yet") } else { Ok(n) }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_retries() {
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = retry_with_backoff(&cancel, 2, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("fail")
        })
        .await;

        assert!(matches!(result, Err(RetryError::Exhausted("fail"))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_cancelled_when_token_fires_up_front() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<(), RetryError<&str>> =
            retry_with_backoff(&cancel, 5, || async { Ok(()) }).await;

        assert!(matches!(result, Err(RetryError::Cancelled)));
    }
}
