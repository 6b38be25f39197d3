//! Curlgate CLI - run the agent and manage its config
//!
//! Usage:
//!   curlgate                              # Serve with ./agent_config.json
//!   curlgate serve --config /etc/cg.json  # Serve with a specific config
//!   curlgate regenerate-key               # Rotate the secure key (offline)
//!   curlgate install-service              # Install the systemd unit

mod service;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use curlgate::{SecureKey, ServerBuilder, config};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Curlgate - secured curl execution agent
#[derive(Parser, Debug)]
#[command(name = "curlgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (created with a fresh key when missing)
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    subcommand: Option<SubCmd>,
}

#[derive(Subcommand, Debug)]
enum SubCmd {
    /// Run the agent (default)
    Serve,
    /// Replace the secure key; a running agent keeps its old key until restart
    RegenerateKey,
    /// Install and register the systemd unit
    InstallService,
    /// Stop, disable and remove the systemd unit
    UninstallService,
    /// Show systemd status of the agent
    ServiceStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curlgate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match args.subcommand.unwrap_or(SubCmd::Serve) {
        SubCmd::Serve => serve(&args.config).await,
        SubCmd::RegenerateKey => {
            let key = config::regenerate_key(Some(&args.config))
                .context("Failed to regenerate secure key")?;
            println!("New secure key: {key}");
            println!("Restart the agent for the new key to take effect.");
            Ok(())
        }
        SubCmd::InstallService => service::install(&args.config),
        SubCmd::UninstallService => service::uninstall(),
        SubCmd::ServiceStatus => service::status(),
    }
}

async fn serve(config_path: &Path) -> Result<()> {
    let loaded = config::load_or_create(Some(config_path))
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    if loaded.created {
        tracing::info!("created config at {}", loaded.path.display());
        // Only time the key is logged; the operator hands it to callers
        tracing::info!("generated secure key: {}", loaded.config.secure_key);
    } else {
        tracing::info!("loaded config from {}", loaded.path.display());
    }

    let router = ServerBuilder::new()
        .secure_key(SecureKey::new(loaded.config.secure_key.clone()))
        .build()
        .context("Failed to build server")?;

    let addr = format!("0.0.0.0:{}", loaded.config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    curlgate::serve(listener, router, shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl_c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
