//! Logging, tracing and metrics bootstrap, mirroring the teacher's own
//! `indexer_common::telemetry` module: `logforth` fed by `fastrace` spans, an OTLP
//! exporter for traces, and a Prometheus scrape endpoint for metrics.

use std::net::SocketAddr;

use fastrace::collector::Config as FastraceConfig;
use logforth::append;
use opentelemetry_otlp::WithExportConfig;
use serde::Deserialize;

/// Initializes the global `log` logger, routed through `logforth` with a fastrace
/// diagnostic so log lines emitted inside a span carry its trace id.
pub fn init_logging() {
    logforth::starter_log::builder()
        .dispatch(|d| d.append(append::Stdout::default()))
        .apply();
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "dex-ingest".to_string()
}

/// Wires up a fastrace reporter; when no OTLP endpoint is configured, spans are
/// collected and dropped (still useful for local `fastrace::collector::full_span_name`
/// style ad hoc debugging, but emits nothing externally).
pub fn init_tracing(config: TracingConfig) -> anyhow::Result<()> {
    match config.otlp_endpoint {
        Some(endpoint) => {
            let reporter = fastrace_opentelemetry::OpenTelemetryReporter::new(
                opentelemetry_otlp::SpanExporter::builder()
                    .with_tonic()
                    .with_endpoint(endpoint)
                    .build()?,
                std::borrow::Cow::Owned(
                    opentelemetry_sdk::Resource::builder()
                        .with_service_name(config.service_name)
                        .build(),
                ),
                opentelemetry::InstrumentationScope::default(),
            );
            fastrace::set_reporter(reporter, FastraceConfig::default());
        }
        None => {
            fastrace::set_reporter(fastrace::collector::ConsoleReporter, FastraceConfig::default());
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub listen_addr: SocketAddr,
}

/// Starts the Prometheus scrape listener in the background.
pub fn init_metrics(config: MetricsConfig) -> anyhow::Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .install()?;
    Ok(())
}

/// Flushes any buffered spans; call this right before process exit.
pub fn flush_tracing() {
    fastrace::flush();
}
