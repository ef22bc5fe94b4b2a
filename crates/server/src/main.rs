//! patchnotes-worker entry point.
//!
//! Boots the caching proxy: restores the previously active generation,
//! starts listening, then installs and activates this build's generation.
//! Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use patchnotes_client::{FetchClient, FetchConfig};
use patchnotes_core::{AppConfig, CacheDb};
use patchnotes_server::worker::messages;
use patchnotes_server::worker::notify::LogNotifier;
use patchnotes_server::{AppState, Worker, WorkerConfig, router};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let origin = config.origin()?;

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache storage at {}", config.db_path.display()))?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let worker = Worker::new(db, network, origin.clone(), WorkerConfig::from(&config));
    worker.restore().await?;

    let (handle, _message_loop) = messages::spawn(worker.clone());
    let app = router(AppState::new(worker.clone(), handle, Arc::new(LogNotifier)));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, %origin, generation = %worker.generation(), "patchnotes-worker listening");

    tokio::spawn(async move {
        if let Err(e) = worker.register().await {
            tracing::error!(error = %e, "worker registration failed");
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
