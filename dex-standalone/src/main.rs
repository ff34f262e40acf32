#[cfg(feature = "cloud")]
#[tokio::main]
async fn main() {
    use dex_common::telemetry;
    use log::error;
    use std::panic;

    telemetry::init_logging();
    panic::set_hook(Box::new(|panic| error!(panic:%; "process panicked")));

    if let Err(error) = run().await {
        let backtrace = error.backtrace();
        let error = format!("{error:#}");
        error!(error, backtrace:%; "process exited with ERROR");
        std::process::exit(1);
    }
}

#[cfg(feature = "cloud")]
async fn run() -> anyhow::Result<()> {
    use std::sync::Arc;

    use anyhow::Context;
    use dex_common::config::ConfigExt;
    use dex_common::infra::pool::postgres::PostgresPool;
    use dex_common::infra::pub_sub::nats::{Config as NatsConfig, NatsMessageSource};
    use dex_common::telemetry;
    use dex_ingest::infra::storage::postgres::PostgresStorage;
    use dex_query::domain::handlers::QueryHandlers;
    use dex_query::infra::storage::postgres::PostgresQueryStorage;
    use log::info;
    use tokio::signal::unix::{SignalKind, signal};
    use tokio_util::sync::CancellationToken;

    #[derive(serde::Deserialize)]
    struct Config {
        storage: dex_common::infra::pool::postgres::Config,
        tracing: telemetry::TracingConfig,
        metrics: telemetry::MetricsConfig,
        nats: NatsConfig,
        ingest: dex_ingest::application::Config,
        query: dex_query::application::Config,
    }

    let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler can be registered");
    let config: Config = Config::load().context("load configuration")?;
    info!("starting dex-standalone");

    telemetry::init_tracing(config.tracing).context("init tracing")?;
    telemetry::init_metrics(config.metrics).context("init metrics")?;

    let pool = PostgresPool::new(config.storage).await.context("create Postgres pool")?;
    let ingest_storage = PostgresStorage::new(pool.clone());
    let query_storage = PostgresQueryStorage::new(pool);
    let query_handlers = Arc::new(QueryHandlers::new(query_storage));

    let source = NatsMessageSource::connect(config.nats).await.context("connect to NATS")?;

    let cancel = CancellationToken::new();

    let mut ingest = tokio::spawn(dex_ingest::application::run(
        config.ingest,
        source,
        ingest_storage,
        cancel.clone(),
    ));
    let query = tokio::spawn(dex_query::application::run(config.query, query_handlers, cancel.clone()));

    tokio::select! {
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
            cancel.cancel();
        }
        result = &mut ingest => {
            cancel.cancel();
            result.context("join ingest task")?.context("ingest application")?;
        }
    }

    query.await.context("join query task")?.context("query application")?;
    telemetry::flush_tracing();
    Ok(())
}

#[cfg(not(feature = "cloud"))]
fn main() {
    unimplemented!()
}
