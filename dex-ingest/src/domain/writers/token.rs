//! Writer for [`Token`] rows, split by `is_creating` into an insert-only stream (first
//! sight of a mint) and an update stream (metadata backfill), grounded on
//! `internal/ingest/handler/token_model_writer.go`'s `splitTokensForInsertAndUpdate`.

use dex_common::domain::Token;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::domain::storage::Storage;
use crate::domain::writers::{WriterError, write_with_retry};

pub const BATCH_SIZE: usize = 1000;

pub async fn write_tokens<S>(
    storage: &S,
    cancel: &CancellationToken,
    tokens: Vec<Token>,
) -> Result<(), WriterError>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    let (to_insert, to_update): (Vec<_>, Vec<_>) = tokens.into_iter().partition(|t| t.is_creating);

    let mut tasks = JoinSet::new();

    for chunk in to_insert.chunks(BATCH_SIZE).map(<[Token]>::to_vec) {
        let storage = storage.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move { write_with_retry(&cancel, || storage.insert_tokens(&chunk)).await });
    }

    for chunk in to_update.chunks(BATCH_SIZE).map(<[Token]>::to_vec) {
        let storage = storage.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move { write_with_retry(&cancel, || storage.update_tokens(&chunk)).await });
    }

    while let Some(result) = tasks.join_next().await {
        result??;
    }

    Ok(())
}
