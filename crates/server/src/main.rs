mod api;
mod cli;
mod router;
mod search_client;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use searchwatch_core::WatchConfig;
use searchwatch_policy::PolicyEngine;

use crate::cli::Cli;
use crate::search_client::ElasticsearchClient;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    searchwatch_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let mut config = WatchConfig::from_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(listen) = cli.listen {
        config.listen_address = listen;
    }
    config.log_summary();

    let backend = Arc::new(ElasticsearchClient::new(&config.elasticsearch_url));
    let engine = Arc::new(
        PolicyEngine::start(&config, backend).context("starting policy engine")?,
    );

    let app = router::build_router(engine.clone());
    let listener = tokio::net::TcpListener::bind(&config.listen_address)
        .await
        .with_context(|| format!("binding {}", config.listen_address))?;
    info!("status page listening on http://{}", config.listen_address);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Stop the loops even when serving failed; the router may still hold
    // a clone of the engine until its connections drain.
    engine.stop();
    match Arc::try_unwrap(engine) {
        Ok(engine) => engine.shutdown().await,
        Err(_) => warn!("status router still holds the engine, not waiting for workers"),
    }

    served.context("status server failed")?;
    Ok(())
}
