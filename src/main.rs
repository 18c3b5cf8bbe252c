//! ftpd - Entry Point
//!
//! Runs the FTP engine with the sample driver configured by `config.toml`.

use anyhow::{Context, Result};
use log::{error, info};
use std::sync::Arc;

use ftpd_core::Server;
use ftpd_core::sample::{AppConfig, SampleDriver};
use ftpd_core::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    info!("Launching FTP server...");

    let config = AppConfig::load().context("failed to load configuration")?;
    info!("Serving files from {}", config.storage.root.display());
    tokio::fs::create_dir_all(&config.storage.root)
        .await
        .with_context(|| format!("cannot create {}", config.storage.root.display()))?;

    let server = Server::bind(Arc::new(SampleDriver::new(config)))
        .await
        .context("failed to start server")?;

    let stopper = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                stopper.shutdown().await;
            }
            Err(e) => error!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    server.serve().await.context("server stopped")?;
    info!("Server exited cleanly");
    Ok(())
}
