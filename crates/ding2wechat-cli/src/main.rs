use anyhow::{Context, Result, anyhow};
use clap::Parser;
use ding2wechat_core::{Config, Dispatcher};
use ding2wechat_gateway::{GatewayServer, GatewayState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ding2wechat")]
#[command(version)]
#[command(about = "Relay DingTalk robot webhooks to WeCom group robots")]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config.file", default_value = "ding2wechat.yml")]
    config_file: PathBuf,

    /// Address to listen on for the receiver endpoint
    #[arg(long = "web.listen-address", default_value = ":8080")]
    listen_address: String,

    /// Only verify the configuration is valid and exit
    #[arg(long)]
    dry_run: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long = "log.level", default_value = "info")]
    log_level: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.debug { "debug" } else { cli.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting ding2wechat {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_file(&cli.config_file)
        .with_context(|| format!("Error parsing config file {}", cli.config_file.display()))?;

    if cli.dry_run {
        info!(
            "Configuration parsed successfully ({} receivers)",
            config.receivers().len()
        );
        return Ok(());
    }

    let bind = parse_listen_address(&cli.listen_address)?;
    cmd_serve(config, bind).await
}

async fn cmd_serve(config: Config, bind: SocketAddr) -> Result<()> {
    for receiver in config.receivers() {
        if receiver.targets.is_empty() {
            warn!("Receiver '{}' has no targets", receiver.name);
        }
    }

    let dispatcher = Dispatcher::http()?;
    let state = GatewayState::new(Arc::new(config), dispatcher);
    let server = GatewayServer::new(bind, state);

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, shutting down...");
        cancel_clone.cancel();
    });

    server.run(cancel).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Parse a listen address, accepting the `:port` shorthand for all interfaces.
fn parse_listen_address(addr: &str) -> Result<SocketAddr> {
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    full.parse()
        .map_err(|e| anyhow!("Invalid listen address '{}': {}", addr, e))
}
