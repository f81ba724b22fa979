//! pantry-proxy entry point.
//!
//! Boot order: load config, open storage, install, activate, then start
//! intercepting. Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::Result;
use pantry_client::{Engine, EngineSettings, FetchClient, FetchConfig, InstallPlan, Lifecycle, Network};
use pantry_core::{AppConfig, CacheStore, RecordStore, StorageDb};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod error;
mod proxy;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db = %config.db_path.display(), version = config.cache_version, "starting pantry-proxy");

    let db = StorageDb::open(&config.db_path).await?;
    let caches: Arc<dyn CacheStore> = Arc::new(db.clone());
    let records: Arc<dyn RecordStore> = Arc::new(db);
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config)?)?);

    let lifecycle = Lifecycle::new(
        Arc::clone(&caches),
        Arc::clone(&records),
        Arc::clone(&network),
        InstallPlan::from_config(&config)?,
    );
    lifecycle.install().await?;
    let pruned = lifecycle.activate().await?;
    tracing::info!(pruned = pruned.len(), "activated");

    let engine = Engine::new(
        caches,
        records,
        Arc::clone(&network),
        EngineSettings::from_config(&config)?,
        lifecycle.readiness(),
    );
    let scheme = config.app_origin_url()?.scheme().to_string();
    let listen = config.listen_socket_addr()?;
    let app = proxy::router(proxy::ProxyState::new(engine, network, scheme, listen));

    let listener = TcpListener::bind(listen).await?;
    tracing::info!(addr = %listen, upstream = %config.app_upstream, "listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
