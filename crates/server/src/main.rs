//! pwa-worker entry point.
//!
//! Loads the configuration, installs and activates the worker for the
//! configured version, then serves its lifecycle tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use pwa_client::{FetchConfig, HttpNetwork, Worker};
use pwa_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod registration;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let snapshot = Arc::new(config.snapshot().context("compiling configuration")?);
    tracing::info!(
        generation = %snapshot.current_generation(),
        strategy = %snapshot.strategy,
        origin = %snapshot.origin,
        "starting pwa-worker on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = HttpNetwork::new(FetchConfig::from_app_config(&config)?)?;
    let registration = Arc::new(registration::HostRegistration::default());
    let worker = Arc::new(Worker::new(
        snapshot,
        Arc::new(db),
        Arc::new(network),
        registration.clone(),
        config.idle_timeout(),
    ));

    let installed = worker.install().await?;
    if !installed.failed.is_empty() {
        tracing::warn!(failed = ?installed.failed, "some URLs could not be precached");
    }
    worker.activate().await?;

    let handler = handler::OfflineServer::new(worker, registration);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
