//! HLX Server - standalone headless server for the HLX multi-zone audio
//! matrix control system.
//!
//! Binds a TCP control socket, drives every inbound connection through the
//! shared dispatcher, and persists configuration to a backup document on
//! disk.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hlx_core::app::{bootstrap_services, serve};
use hlx_core::events::NoopStateChangeSink;
use hlx_core::runtime::TokioSpawner;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::ServerConfig;

/// HLX Server - headless multi-zone audio matrix control server.
#[derive(Parser, Debug)]
#[command(name = "hlx-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "HLX_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind address (overrides config file).
    #[arg(short = 'b', long, env = "HLX_BIND_ADDR")]
    bind_addr: Option<std::net::SocketAddr>,

    /// Path to the persisted backup document (overrides config file).
    #[arg(short = 'f', long, env = "HLX_BACKUP_PATH")]
    backup_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("HLX Server v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(backup_path) = args.backup_path {
        config.backup_path = backup_path;
    }

    log::info!(
        "Configuration: bind_addr={}, backup_path={}",
        config.bind_addr,
        config.backup_path.display()
    );

    let services = bootstrap_services(
        &config.backup_path,
        Arc::new(NoopStateChangeSink),
        TokioSpawner::current(),
    );

    services
        .start()
        .await
        .context("Failed to load or initialize the backup document")?;

    log::info!("Configuration loaded; autosave timer started");

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    log::info!("Listening on {}", config.bind_addr);

    let cancel_token = services.cancel_token.clone();
    let accept_cancel = cancel_token.clone();
    let accept_task = tokio::spawn(serve(listener, services.dispatcher.clone(), accept_cancel));

    shutdown_signal().await;
    log::info!("Shutdown signal received, cleaning up...");

    cancel_token.cancel();
    let _ = accept_task.await;

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
