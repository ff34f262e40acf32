//! The buffer a partition worker accumulates between flushes. Grounded on the original
//! `BlockBatch`/`WorkerContext` shape (`internal/ingest/worker.go`): a worker holds at
//! most a handful of these in flight, so the buffer is sized generously and compacted
//! periodically rather than reallocated per flush.

use dex_common::domain::{Balance, ChainEvent, Pool, Token, TransferEvent};

/// Extra capacity kept when a batch is reused after a flush, avoiding a reallocation on
/// every cycle for workloads whose batch size fluctuates only slightly.
pub const BUFFER_SLACK: usize = 10;

/// How many flushes a worker performs before compacting (shrinking) its reusable
/// buffers back down to their slack-only capacity, bounding unbounded growth from the
/// occasional oversized block.
pub const COMPACT_EVERY_N_FLUSHES: u64 = 100;

#[derive(Debug, Default)]
pub struct BlockBatch {
    pub slot: u64,
    pub is_realtime_hint: bool,
    pub chain_events: Vec<ChainEvent>,
    pub transfer_events: Vec<TransferEvent>,
    pub pools: Vec<Pool>,
    pub tokens: Vec<Token>,
    pub balances: Vec<Balance>,
}

impl BlockBatch {
    pub fn is_empty(&self) -> bool {
        self.chain_events.is_empty()
            && self.transfer_events.is_empty()
            && self.pools.is_empty()
            && self.tokens.is_empty()
            && self.balances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chain_events.len()
            + self.transfer_events.len()
            + self.pools.len()
            + self.tokens.len()
            + self.balances.len()
    }

    pub fn clear(&mut self) {
        self.chain_events.clear();
        self.transfer_events.clear();
        self.pools.clear();
        self.tokens.clear();
        self.balances.clear();
    }

    /// Shrinks buffers back to `len + BUFFER_SLACK`, releasing memory retained by a
    /// rare oversized block without paying a reallocation on every ordinary flush.
    pub fn compact(&mut self) {
        self.chain_events.shrink_to(self.chain_events.len() + BUFFER_SLACK);
        self.transfer_events.shrink_to(self.transfer_events.len() + BUFFER_SLACK);
        self.pools.shrink_to(self.pools.len() + BUFFER_SLACK);
        self.tokens.shrink_to(self.tokens.len() + BUFFER_SLACK);
        self.balances.shrink_to(self.balances.len() + BUFFER_SLACK);
    }
}
