//! Balance writer: the one writer with real reconciliation logic, grounded on
//! `internal/ingest/handler/balance_model_writer.go`'s `InsertBalances`.
//!
//! Steps, in order:
//! 1. Intra-batch dedup by `account_address`, keeping the row with the highest
//!    `last_event_id` (a batch can carry more than one update for the same account).
//! 2. Split survivors into `to_update` (non-zero balance) and `to_delete` (zero
//!    balance — a closed token account).
//! 3. Realtime path: upsert/delete unconditionally (last writer wins; realtime traffic
//!    arrives in order so no conflict check is needed).
//! 4. Historical path (backfill/replay, which can race with already-applied realtime
//!    writes): fetch the currently stored `last_event_id` for the batch's accounts and
//!    only apply updates that are still ahead of what is stored (`>` for updates, `>=`
//!    for deletes — a delete with an equal id is still the authoritative delete for
//!    that write).

use std::collections::HashMap;

use dex_common::domain::Balance;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::domain::storage::Storage;
use crate::domain::writers::{WriterError, write_with_retry};

pub const BATCH_SIZE: usize = 2000;

pub async fn write_balances<S>(
    storage: &S,
    cancel: &CancellationToken,
    balances: Vec<Balance>,
    is_realtime: bool,
) -> Result<(), WriterError>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    let deduped = dedup_by_max_last_event_id(balances);
    let (to_update, to_delete): (Vec<_>, Vec<_>) =
        deduped.into_iter().partition(|b| !b.is_zero());

    if is_realtime {
        write_realtime(storage, cancel, to_update, to_delete).await
    } else {
        write_historical(storage, cancel, to_update, to_delete).await
    }
}

fn dedup_by_max_last_event_id(balances: Vec<Balance>) -> Vec<Balance> {
    let mut latest: HashMap<String, Balance> = HashMap::with_capacity(balances.len());
    for balance in balances {
        match latest.get(&balance.account_address) {
            Some(existing) if existing.last_event_id >= balance.last_event_id => {}
            _ => {
                latest.insert(balance.account_address.clone(), balance);
            }
        }
    }
    latest.into_values().collect()
}

async fn write_realtime<S>(
    storage: &S,
    cancel: &CancellationToken,
    to_update: Vec<Balance>,
    to_delete: Vec<Balance>,
) -> Result<(), WriterError>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    let mut tasks = JoinSet::new();

    for chunk in to_update.chunks(BATCH_SIZE).map(<[Balance]>::to_vec) {
        let storage = storage.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move { write_with_retry(&cancel, || storage.upsert_balances(&chunk)).await });
    }

    for chunk in to_delete.chunks(BATCH_SIZE) {
        let accounts = chunk.iter().map(|b| b.account_address.clone()).collect::<Vec<_>>();
        let storage = storage.clone();
        let cancel = cancel.clone();
        tasks.spawn(
            async move { write_with_retry(&cancel, || storage.delete_balances(&accounts)).await },
        );
    }

    while let Some(result) = tasks.join_next().await {
        result??;
    }

    Ok(())
}

async fn write_historical<S>(
    storage: &S,
    cancel: &CancellationToken,
    to_update: Vec<Balance>,
    to_delete: Vec<Balance>,
) -> Result<(), WriterError>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    let update_survivors = filter_by_last_event_id(storage, to_update, false).await?;
    let delete_survivors = filter_by_last_event_id(storage, to_delete, true).await?;

    let mut tasks = JoinSet::new();

    for chunk in update_survivors.chunks(BATCH_SIZE).map(<[Balance]>::to_vec) {
        let storage = storage.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move { write_with_retry(&cancel, || storage.upsert_balances(&chunk)).await });
    }

    for chunk in delete_survivors.chunks(BATCH_SIZE) {
        let accounts = chunk.iter().map(|b| b.account_address.clone()).collect::<Vec<_>>();
        let storage = storage.clone();
        let cancel = cancel.clone();
        tasks.spawn(
            async move { write_with_retry(&cancel, || storage.delete_balances(&accounts)).await },
        );
    }

    while let Some(result) = tasks.join_next().await {
        result??;
    }

    Ok(())
}

/// Fetches currently-stored `last_event_id`s in batches of [`BATCH_SIZE`] and keeps
/// only balances whose `last_event_id` is still ahead of what's stored. An account with
/// no stored row at all always survives (nothing to be superseded by).
async fn filter_by_last_event_id<S>(
    storage: &S,
    balances: Vec<Balance>,
    is_delete: bool,
) -> Result<Vec<Balance>, WriterError>
where
    S: Storage,
{
    if balances.is_empty() {
        return Ok(balances);
    }

    let mut stored = HashMap::with_capacity(balances.len());
    for chunk in balances.chunks(BATCH_SIZE) {
        let accounts = chunk.iter().map(|b| b.account_address.clone()).collect::<Vec<_>>();
        for (account, last_event_id) in storage.fetch_last_event_ids(&accounts).await? {
            stored.insert(account, last_event_id);
        }
    }

    Ok(balances
        .into_iter()
        .filter(|b| match stored.get(&b.account_address) {
            None => true,
            Some(&existing) if is_delete => b.last_event_id >= existing,
            Some(&existing) => b.last_event_id > existing,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::test_support::FakeStorage;

    fn balance(account: &str, amount: &str, last_event_id: i64) -> Balance {
        Balance {
            account_address: account.into(),
            owner_address: "owner".into(),
            token_address: "tok".into(),
            balance: amount.into(),
            last_event_id,
        }
    }

    #[test]
    fn dedup_keeps_highest_last_event_id() {
        let balances = vec![balance("a", "1", 5), balance("a", "2", 10), balance("a", "3", 3)];
        let deduped = dedup_by_max_last_event_id(balances);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].balance, "2");
    }

    #[tokio::test]
    async fn realtime_path_splits_zero_into_delete() {
        let storage = FakeStorage::default();
        let cancel = CancellationToken::new();
        storage.upsert_balances(&[balance("a", "5", 1)]).await.unwrap();

        write_balances(&storage, &cancel, vec![balance("a", "0", 2)], true).await.unwrap();

        assert!(storage.balances().is_empty());
    }

    #[tokio::test]
    async fn historical_path_rejects_stale_update() {
        let storage = FakeStorage::default();
        let cancel = CancellationToken::new();
        storage.upsert_balances(&[balance("a", "5", 10)]).await.unwrap();

        write_balances(&storage, &cancel, vec![balance("a", "99", 3)], false).await.unwrap();

        let stored = storage.balances();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].balance, "5");
    }

    #[tokio::test]
    async fn historical_path_accepts_newer_update() {
        let storage = FakeStorage::default();
        let cancel = CancellationToken::new();
        storage.upsert_balances(&[balance("a", "5", 10)]).await.unwrap();

        write_balances(&storage, &cancel, vec![balance("a", "99", 20)], false).await.unwrap();

        let stored = storage.balances();
        assert_eq!(stored[0].balance, "99");
    }

    #[tokio::test]
    async fn historical_path_accepts_equal_id_delete() {
        let storage = FakeStorage::default();
        let cancel = CancellationToken::new();
        storage.upsert_balances(&[balance("a", "5", 10)]).await.unwrap();

        write_balances(&storage, &cancel, vec![balance("a", "0", 10)], false).await.unwrap();

        assert!(storage.balances().is_empty());
    }

    #[tokio::test]
    async fn historical_path_accepts_account_with_no_existing_row() {
        let storage = FakeStorage::default();
        let cancel = CancellationToken::new();

        write_balances(&storage, &cancel, vec![balance("new", "7", 1)], false).await.unwrap();

        assert_eq!(storage.balances().len(), 1);
    }
}
