//! Faucet service binary

use anyhow::Context;
use clap::Parser;
use faucet_common::utils::config::load_config;
use faucet_common::utils::logging::init_logging;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use testnet_faucet::api::router;
use testnet_faucet::{CooldownSweeper, FaucetConfig, FaucetService};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Faucet service CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path (TOML, YAML or JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server address
    #[arg(long)]
    server_addr: Option<String>,

    /// Primary chain RPC URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // File first, then environment, then CLI
    let mut config = match &args.config {
        Some(path) => load_config::<FaucetConfig, _>(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => FaucetConfig::default(),
    };
    config.apply_env();

    if let Some(addr) = args.server_addr {
        config.server_addr = addr;
    }

    if let Some(rpc_url) = args.rpc_url {
        config.primary.rpc_url = rpc_url;
    }

    if args.debug {
        config.logging.level = "debug".to_string();
    }

    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("logging setup failed: {}", e))?;

    info!("Starting faucet service v{}", env!("CARGO_PKG_VERSION"));

    config.validate().context("invalid configuration")?;

    info!("Configuration:");
    info!("  Server address: {}", config.server_addr);
    for chain in config.chains() {
        info!("  Chain {}: {}", chain.name, chain.rpc_url);
    }

    let service = Arc::new(FaucetService::from_config(&config).context("building faucet service")?);
    info!("Faucet service initialized");

    let sweeper = CooldownSweeper::start(service.cooldowns(), config.sweep_interval());

    let mut app = router(service.clone());

    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        app = app.layer(cors);
        info!("CORS enabled");
    }

    let addr: SocketAddr = config.server_addr.parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    info!("Shutting down gracefully");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
