pub mod balance;
pub mod chain_event;
pub mod pool;
pub mod token;
pub mod transfer_event;

use std::future::Future;

use dex_common::retry::RetryError;
use tokio_util::sync::CancellationToken;

/// Max retries per batch write; matches the original's `RetryWithBackoff(ctx, 10, ...)`
/// call sites.
pub const MAX_RETRIES: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("write cancelled")]
    Cancelled,

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("a concurrent writer task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<RetryError<sqlx::Error>> for WriterError {
    fn from(err: RetryError<sqlx::Error>) -> Self {
        match err {
            RetryError::Cancelled => WriterError::Cancelled,
            RetryError::Exhausted(err) => WriterError::Store(err),
        }
    }
}

/// Per-worker chunk size for a parallelised writer: split `n` rows across up to
/// `max_workers` workers, with each worker's chunk never smaller than `min_batch` (so a
/// small flush doesn't spin up workers that would only handle a handful of rows each).
pub(crate) fn worker_chunk_size(n: usize, max_workers: usize, min_batch: usize) -> usize {
    if n == 0 {
        return 0;
    }
    n.div_ceil(max_workers.max(1)).max(min_batch)
}

/// Runs `write` with the standard retry schedule, matching every writer's
/// `RetryWithBackoff(ctx, MAX_RETRIES, ...)` call.
pub(crate) async fn write_with_retry<T, F, Fut>(
    cancel: &CancellationToken,
    write: F,
) -> Result<T, WriterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    dex_common::retry::retry_with_backoff(cancel, MAX_RETRIES, write)
        .await
        .map_err(WriterError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_needs_no_workers() {
        assert_eq!(worker_chunk_size(0, 6, 100), 0);
    }

    #[test]
    fn small_input_stays_under_one_worker() {
        assert_eq!(worker_chunk_size(50, 6, 100), 100);
    }

    #[test]
    fn large_input_splits_across_up_to_six_workers() {
        let chunk = worker_chunk_size(6000, 6, 100);
        assert_eq!(chunk, 1000);
        assert_eq!(6000usize.div_ceil(chunk), 6);
    }

    #[test]
    fn never_drops_below_the_minimum_batch() {
        let chunk = worker_chunk_size(250, 6, 100);
        assert_eq!(chunk, 100);
        assert_eq!(250usize.div_ceil(chunk), 3, "fewer than 6 workers when rows are scarce");
    }
}
