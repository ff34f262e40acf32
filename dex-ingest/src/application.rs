//! Top-level ingest loop: pulls bundles off a [`MessageSource`], routes each to its
//! partition worker, and shuts down cleanly on cancellation. Grounded on
//! `chain_indexer::application::run`'s task-spawn-and-select shape.

use std::sync::Arc;

use dex_common::infra::pub_sub::MessageSource;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::domain::router::PartitionRouter;
use crate::domain::storage::Storage;
use crate::domain::worker::WorkerConfig;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub worker: WorkerConfig,
}

pub async fn run<M, S>(
    config: Config,
    source: M,
    storage: S,
    cancel: CancellationToken,
) -> anyhow::Result<()>
where
    M: MessageSource + Send + Sync + 'static,
    S: Storage + Clone + Send + Sync + 'static,
{
    let source = Arc::new(source);
    let router = PartitionRouter::new(storage, Arc::clone(&source), config.worker, cancel.clone());

    let mut bundles = std::pin::pin!(source.bundles());

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            maybe_bundle = bundles.next() => {
                match maybe_bundle {
                    Some(Ok(bundle)) => router.dispatch(bundle).await,
                    Some(Err(err)) => log::error!(err:err; "message source error"),
                    None => break,
                }
            }
        }
    }

    router.stop().await;
    Ok(())
}
