//! redlite server entry point.
//!
//! Sets up logging, the shared storage engine, the expiry sweeper and the
//! TCP listener, then serves clients until Ctrl+C.

use clap::Parser;
use redlite::commands::CommandHandler;
use redlite::config::Config;
use redlite::connection::handle_connection;
use redlite::storage::{ExpirySweeper, StorageEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    // Shared by every connection
    let storage = Arc::new(StorageEngine::new());
    let sweeper = ExpirySweeper::start(Arc::clone(&storage), config.expiry_config());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(
        version = redlite::VERSION,
        address = %config.bind_address(),
        "Listening"
    );

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, storage) => {}
        _ = shutdown => {}
    }

    sweeper.stop();
    info!("Server shutdown complete");
    Ok(())
}

/// Accepts connections forever, one task per client.
async fn accept_loop(listener: TcpListener, storage: Arc<StorageEngine>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&storage));
                tokio::spawn(handle_connection(stream, addr, handler));
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}
