//! Insert-only writer for [`TransferEvent`] rows — identical shape to the chain event
//! writer since no distinct transfer writer survived filtering from the original
//! source; the original treats plain transfers through the same code path shape as
//! chain events (up to 6 concurrent workers, 1000 rows per statement, insert-or-ignore).

use dex_common::domain::TransferEvent;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::domain::storage::Storage;
use crate::domain::writers::{WriterError, worker_chunk_size, write_with_retry};

pub const SQL_BATCH_SIZE: usize = 1000;
const MAX_WORKERS: usize = 6;
const MIN_WORKER_BATCH: usize = 100;

pub async fn write_transfer_events<S>(
    storage: &S,
    cancel: &CancellationToken,
    events: Vec<TransferEvent>,
) -> Result<(), WriterError>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    if events.is_empty() {
        return Ok(());
    }

    let chunk_size = worker_chunk_size(events.len(), MAX_WORKERS, MIN_WORKER_BATCH);
    let mut tasks = JoinSet::new();
    for chunk in events.chunks(chunk_size).map(<[TransferEvent]>::to_vec) {
        let storage = storage.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            for batch in chunk.chunks(SQL_BATCH_SIZE) {
                write_with_retry(&cancel, || storage.insert_transfer_events(batch)).await?;
            }
            Ok::<(), WriterError>(())
        });
    }

    while let Some(result) = tasks.join_next().await {
        result??;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::test_support::FakeStorage;

    fn event(id: i64) -> TransferEvent {
        TransferEvent {
            event_id_hash: 0,
            event_id: id,
            from_wallet: "a".into(),
            to_wallet: "b".into(),
            token: "t".into(),
            amount: "1".into(),
            decimals: 6,
            tx_hash: "h".into(),
            signer: "s".into(),
            block_time: 0,
            create_at: 0,
        }
    }

    #[tokio::test]
    async fn writes_all_events() {
        let storage = FakeStorage::default();
        let cancel = CancellationToken::new();
        write_transfer_events(&storage, &cancel, vec![event(1), event(2)]).await.unwrap();
        assert_eq!(storage.transfer_events().len(), 2);
    }
}
