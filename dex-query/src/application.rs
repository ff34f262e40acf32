//! Wires the [`QueryHandlers`] behind a minimal `axum` health surface and serves until
//! signalled to stop, the way `spo_api::application::run` wires `AxumApi` behind its own
//! `axum::serve` call.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use log::info;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::domain::handlers::QueryHandlers;
use crate::domain::storage::QueryStorage;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub listen_addr: SocketAddr,
}

/// Serves `GET /healthz` returning `200 OK` until `cancel` fires, then shuts down
/// gracefully. The `QueryHandlers` themselves aren't reachable over this surface — the
/// gRPC transport that would expose them is out of scope (see `SPEC_FULL.md` §6); this
/// endpoint exists purely so `dex-standalone` has something for a liveness probe to hit.
pub async fn run<S>(
    config: Config,
    handlers: Arc<QueryHandlers<S>>,
    cancel: CancellationToken,
) -> anyhow::Result<()>
where
    S: QueryStorage + Send + Sync + 'static,
{
    // `handlers` isn't reachable over this surface yet (see doc comment above) but is
    // kept alive for the duration of the serve loop so the caller can share the same
    // `Arc` with whatever does eventually front it.
    let _handlers = handlers;

    let app: Router<()> = Router::new().route("/healthz", get(|| async { "OK" }));

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr:% = config.listen_addr; "query service listening");

    axum::serve(listener, app).with_graceful_shutdown(cancel.cancelled_owned()).await?;
    Ok(())
}
