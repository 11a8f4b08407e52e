//! mirrormgrd - Traffic Mirror Manager Daemon
//!
//! Entry point: wires the durable store, controller gateways, registry
//! and manager together, restores mirrors from the store, then serves
//! the REST API until shutdown.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mirrormgrd::gateway::ControllerApi;
use mirrormgrd::store::{MirrorStore, RedisMirrorStore, RetryingStore};
use mirrormgrd::{rest_api, Config, MirrorMgr, MirrorRegistry};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store = RedisMirrorStore::connect(&config.store_url)
        .await
        .with_context(|| format!("connecting to store at {}", config.store_url))?;
    let store: Arc<dyn MirrorStore> =
        Arc::new(RetryingStore::new(store, config.retry_policy()));

    let client = reqwest::Client::builder()
        .timeout(config.gateway_timeout())
        .build()
        .context("building controller HTTP client")?;
    let controller = Arc::new(ControllerApi::new(client, &config.controller_url));

    let registry = Arc::new(MirrorRegistry::new());
    let mgr = Arc::new(MirrorMgr::new(
        registry,
        store,
        controller.clone(),
        controller.clone(),
        controller,
    ));
    mgr.load().await.context("restoring mirrors from store")?;

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    info!(listen = %config.listen, "mirrormgrd: serving REST API");

    axum::serve(listener, rest_api::router(mgr))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving REST API")?;

    info!("mirrormgrd: graceful shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("mirrormgrd: received SIGINT, shutting down");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = Config::parse();
    info!(
        controller = %config.controller_url,
        store = %config.store_url,
        "mirrormgrd: starting"
    );

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "mirrormgrd: exiting with error");
            ExitCode::FAILURE
        }
    }
}
