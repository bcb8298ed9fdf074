//! Autoindex
//!
//! Serves file and directory metadata under a root over HTTP, cached per path.
//!
//! Usage:
//!     autoindex --config /etc/autoindex/config.toml
//!     autoindex --root /srv/files --port 8080

use anyhow::{Context, Result};
use autoindex::{server, Args, Config};
use autoindex_index::Index;
use autoindex_logging::{init_logging, logger_for_level, LogConfig};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let level = config.log_level();
    init_logging(LogConfig { level })?;

    info!("Starting autoindex {}", env!("CARGO_PKG_VERSION"));
    match &source {
        Some(path) => info!("  Config: {}", path.display()),
        None => info!("  Config: built-in defaults"),
    }
    info!("  Root: {}", config.filesystem.root.display());

    let index = Arc::new(
        Index::new(config.index_config(), logger_for_level(level))
            .context("Failed to create index")?,
    );

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening at http://{}", listener.local_addr()?);

    server::serve(listener, Arc::clone(&index), shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutting down");
    index.close().context("Failed to close index")?;

    let snapshot = index.metrics().snapshot();
    info!(
        queries = snapshot.queries,
        cache_hits = snapshot.cache_hits,
        probes = snapshot.probes,
        not_found = snapshot.not_found,
        hit_ratio = snapshot.hit_ratio(),
        "Final query metrics"
    );

    Ok(())
}
