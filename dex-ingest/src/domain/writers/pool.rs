//! Dedup-and-split writer for [`Pool`] rows. Grounded on
//! `internal/ingest/handler/pool_model_writer.go`'s `dedupAndValidatePools`: pools are
//! deduplicated by `(pool_address, token_account, quote_account)`, an identity conflict
//! on the same key is logged and the conflicting row dropped rather than merged, and
//! survivors take the earliest non-zero `create_at` seen across duplicates. Survivors
//! are then split into a `with_create_at` group (creation observed) and a
//! `without_create_at` group (update-only, must not clobber an earlier `create_at`),
//! each written through its own SQL shape with up to 4 workers allocated between them
//! proportionally to their sizes.

use std::collections::HashMap;

use dex_common::domain::Pool;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::domain::storage::Storage;
use crate::domain::writers::{WriterError, worker_chunk_size, write_with_retry};

/// Per-statement `INSERT` row cap.
pub const SQL_BATCH_SIZE: usize = 1000;
/// Upper bound on concurrent writer tasks, shared between both groups.
const MAX_WORKERS: usize = 4;
const MIN_WORKER_BATCH: usize = 100;

pub async fn write_pools<S>(
    storage: &S,
    cancel: &CancellationToken,
    pools: Vec<Pool>,
    now: i32,
) -> Result<(), WriterError>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    let pools = dedup_and_validate(pools, now);
    if pools.is_empty() {
        return Ok(());
    }

    let (with_create_at, without_create_at): (Vec<Pool>, Vec<Pool>) =
        pools.into_iter().partition(|p| p.create_at > 0);
    let (with_workers, without_workers) =
        allocate_workers(with_create_at.len(), without_create_at.len());

    tokio::try_join!(
        write_group(storage, cancel, with_create_at, with_workers, true),
        write_group(storage, cancel, without_create_at, without_workers, false),
    )?;

    Ok(())
}

/// Splits `pools` across `workers` concurrent tasks, each writing its slice through
/// `with_create_at`'s matching SQL shape in sub-batches of [`SQL_BATCH_SIZE`].
async fn write_group<S>(
    storage: &S,
    cancel: &CancellationToken,
    pools: Vec<Pool>,
    workers: usize,
    with_create_at: bool,
) -> Result<(), WriterError>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    if pools.is_empty() {
        return Ok(());
    }

    let chunk_size = worker_chunk_size(pools.len(), workers.max(1), MIN_WORKER_BATCH);
    let mut tasks = JoinSet::new();
    for chunk in pools.chunks(chunk_size).map(<[Pool]>::to_vec) {
        let storage = storage.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            for batch in chunk.chunks(SQL_BATCH_SIZE) {
                write_with_retry(&cancel, || async {
                    if with_create_at {
                        storage.upsert_pools_with_create_at(batch).await
                    } else {
                        storage.upsert_pools_without_create_at(batch).await
                    }
                })
                .await?;
            }
            Ok::<(), WriterError>(())
        });
    }

    while let Some(result) = tasks.join_next().await {
        result??;
    }

    Ok(())
}

/// Allocates up to [`MAX_WORKERS`] between the two groups proportionally to their
/// sizes, never leaving a non-empty group with zero workers and never giving a group
/// more workers than it has rows to keep each worker's batch at or above
/// [`MIN_WORKER_BATCH`].
fn allocate_workers(with_len: usize, without_len: usize) -> (usize, usize) {
    let cap = |len: usize| if len == 0 { 0 } else { len.div_ceil(MIN_WORKER_BATCH).max(1) };
    let with_cap = cap(with_len).min(MAX_WORKERS);
    let without_cap = cap(without_len).min(MAX_WORKERS);

    if with_cap == 0 {
        return (0, without_cap);
    }
    if without_cap == 0 {
        return (with_cap, 0);
    }

    let total = with_len + without_len;
    let mut with_workers = ((with_len * MAX_WORKERS) / total).clamp(1, MAX_WORKERS - 1).min(with_cap);
    let mut without_workers = (MAX_WORKERS - with_workers).min(without_cap);

    let spare = MAX_WORKERS - with_workers - without_workers;
    if spare > 0 {
        with_workers += spare.min(with_cap - with_workers);
    }

    (with_workers, without_workers)
}

fn dedup_and_validate(pools: Vec<Pool>, now: i32) -> Vec<Pool> {
    let mut merged: HashMap<(String, String, String), Pool> = HashMap::with_capacity(pools.len());

    for pool in pools {
        let key = (pool.pool_address.clone(), pool.token_account.clone(), pool.quote_account.clone());

        match merged.get_mut(&key) {
            None => {
                merged.insert(key, pool);
            }
            Some(existing) => {
                if existing.dex != pool.dex
                    || existing.token_address != pool.token_address
                    || existing.quote_address != pool.quote_address
                {
                    log::warn!(
                        pool_address = pool.pool_address,
                        token_account = pool.token_account,
                        quote_account = pool.quote_account;
                        "dropping pool with conflicting identity for the same account pair"
                    );
                    continue;
                }

                existing.create_at = earliest_non_zero(existing.create_at, pool.create_at);
            }
        }
    }

    merged
        .into_values()
        .map(|mut pool| {
            pool.update_at = now;
            pool
        })
        .collect()
}

fn earliest_non_zero(a: i32, b: i32) -> i32 {
    match (a, b) {
        (0, b) => b,
        (a, 0) => a,
        (a, b) => a.min(b),
    }
}
