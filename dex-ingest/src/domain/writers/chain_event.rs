//! Insert-only writer for [`ChainEvent`] rows. Grounded on
//! `internal/ingest/handler/chain_event_writer.go`'s `InsertChainEvents`: split across
//! up to 6 concurrent workers, insert-or-ignore, up to 1000 rows per statement, retried
//! with the standard backoff schedule.

use dex_common::domain::ChainEvent;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::domain::storage::Storage;
use crate::domain::writers::{WriterError, worker_chunk_size, write_with_retry};

/// Per-statement `INSERT` row cap.
pub const SQL_BATCH_SIZE: usize = 1000;
/// Upper bound on concurrent writer tasks for one flush.
const MAX_WORKERS: usize = 6;
const MIN_WORKER_BATCH: usize = 100;

pub async fn write_chain_events<S>(
    storage: &S,
    cancel: &CancellationToken,
    events: Vec<ChainEvent>,
) -> Result<(), WriterError>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    if events.is_empty() {
        return Ok(());
    }

    let chunk_size = worker_chunk_size(events.len(), MAX_WORKERS, MIN_WORKER_BATCH);
    let mut tasks = JoinSet::new();
    for chunk in events.chunks(chunk_size).map(<[ChainEvent]>::to_vec) {
        let storage = storage.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            for batch in chunk.chunks(SQL_BATCH_SIZE) {
                write_with_retry(&cancel, || storage.insert_chain_events(batch)).await?;
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

    fn event(id: i64) -> ChainEvent {
        ChainEvent {
            event_id_hash: 0,
            event_id: id,
            event_type: dex_common::domain::EventType::Trade,
            dex: dex_common::domain::Dex::RaydiumAmm,
            user_wallet: "w".into(),
            to_wallet: "".into(),
            pool_address: "p".into(),
            token: "t".into(),
            quote_token: "q".into(),
            token_amount: "1".into(),
            quote_amount: "1".into(),
            volume_usd: 0.0,
            price_usd: 0.0,
            tx_hash: "h".into(),
            signer: "s".into(),
            block_time: 0,
            create_at: 0,
        }
    }

    #[tokio::test]
    async fn writes_all_events_in_chunks() {
        let storage = FakeStorage::default();
        let cancel = CancellationToken::new();
        let events = (0..2500).map(event).collect::<Vec<_>>();

        write_chain_events(&storage, &cancel, events).await.unwrap();

        assert_eq!(storage.chain_events().len(), 2500);
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() {
        let storage = FakeStorage::default();
        let cancel = CancellationToken::new();
        write_chain_events(&storage, &cancel, vec![]).await.unwrap();
        assert!(storage.chain_events().is_empty());
    }
}
