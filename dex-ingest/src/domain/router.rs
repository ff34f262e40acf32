//! Lazily spawns one worker per partition and routes bundles to it. Grounded on
//! `internal/ingest/router.go`'s `PartitionRouter`.

use std::sync::Arc;

use dashmap::DashMap;
use dex_common::infra::pub_sub::{MessageSource, PartitionedBundle};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::domain::storage::Storage;
use crate::domain::worker::{self, WorkerConfig};

/// Bounded per-partition channel depth. Backpressure is applied by blocking on send
/// rather than dropping — the router never drops a message.
const CHANNEL_CAPACITY: usize = 1000;

pub struct PartitionRouter<S, M> {
    storage: S,
    source: Arc<M>,
    config: WorkerConfig,
    cancel: CancellationToken,
    workers: DashMap<i32, mpsc::Sender<PartitionedBundle>>,
    tasks: tokio::sync::Mutex<JoinSet<()>>,
}

impl<S, M> PartitionRouter<S, M>
where
    S: Storage + Clone + Send + Sync + 'static,
    M: MessageSource + Send + Sync + 'static,
{
    pub fn new(storage: S, source: Arc<M>, config: WorkerConfig, cancel: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            storage,
            source,
            config,
            cancel,
            workers: DashMap::new(),
            tasks: tokio::sync::Mutex::new(JoinSet::new()),
        })
    }

    /// Routes `bundle` to its partition's worker, spawning the worker on first sight of
    /// that partition.
    pub async fn dispatch(self: &Arc<Self>, bundle: PartitionedBundle) {
        let partition = bundle.partition;

        let sender = match self.workers.get(&partition) {
            Some(sender) => sender.clone(),
            None => self.spawn_worker(partition).await,
        };

        if sender.send(bundle).await.is_err() {
            log::warn!(partition; "partition worker channel closed, dropping in-flight message");
        }
    }

    async fn spawn_worker(self: &Arc<Self>, partition: i32) -> mpsc::Sender<PartitionedBundle> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        match self.workers.entry(partition) {
            dashmap::mapref::entry::Entry::Occupied(entry) => return entry.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(tx.clone());
            }
        }

        let storage = self.storage.clone();
        let source = Arc::clone(&self.source);
        let config = self.config.clone();
        let cancel = self.cancel.clone();
        self.tasks.lock().await.spawn(async move {
            worker::run(partition, rx, storage, source, config, cancel).await;
        });

        tx
    }

    /// Cancels every worker and waits for them to finish flushing in-flight batches.
    pub async fn stop(self: &Arc<Self>) {
        self.cancel.cancel();
        self.workers.clear();
        let mut tasks = self.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
    }
}
