use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::oneshot;

use igt_exporter::config::ExporterArgs;
use igt_exporter::fallback::FallbackPolicy;
use igt_exporter::logging;
use igt_exporter::metrics::server::MetricsServer;
use igt_exporter::metrics::MetricStore;
use igt_exporter::sampler::Sampler;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ExporterArgs::parse();
    logging::init(args.debug);

    tracing::info!("starting igt-exporter");

    let store = MetricStore::new();
    let policy = FallbackPolicy::new(args.fallback_from_rc6, &args.fallback_targets);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server = MetricsServer::new(store.clone(), args.listen_addr.clone());
    let server_task = tokio::spawn(server.run(shutdown_rx));

    // The sampling loop owns the process lifetime: when the subprocess
    // stream closes, the exporter is done.
    let sampler = Sampler::new(args, store, policy);
    sampler.run().await?;

    let _ = shutdown_tx.send(());
    server_task
        .await
        .context("metrics server task panicked")??;

    Ok(())
}
