//! Binary entry point: connect, sync state, log what happens.
//!
//! Runs the client as a headless session mirror until interrupted. Useful
//! for watching a venue account live and as a wiring example for
//! embedders.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use arena_client::notice::NoticeLevel;
use arena_client::{ArenaClient, ClientConfig};

#[derive(Debug, Parser)]
#[command(name = "arena-client", about = "Real-time client for the arena paper-trading venue")]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config/client.toml")]
    config: PathBuf,

    /// Override the venue base URL.
    #[arg(long)]
    server_url: Option<String>,

    /// Override the bootstrap username.
    #[arg(long)]
    username: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(url) = &self.server_url {
            config.server_url = url.clone();
        }
        if let Some(username) = &self.username {
            config.bootstrap.username = username.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = if args.config.exists() {
        ClientConfig::from_file(&args.config)
            .with_context(|| format!("loading config from {}", args.config.display()))?
    } else {
        let mut config = ClientConfig::default();
        config.apply_env_overrides();
        config
    };
    args.apply(&mut config);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!(server = %config.server_url, username = %config.bootstrap.username, "starting arena client");

    let client = ArenaClient::new(config).context("building client")?;

    // Log notices as they arrive
    if let Some(mut notices) = client.take_notices() {
        tokio::spawn(async move {
            while let Some(notice) = notices.recv().await {
                match notice.level() {
                    NoticeLevel::Error => error!(%notice, "session event"),
                    NoticeLevel::Warning => warn!(%notice, "session event"),
                    _ => info!(%notice, "session event"),
                }
            }
        });
    }

    // Log connection-state transitions
    let mut conn_states = client.watch_conn_state();
    tokio::spawn(async move {
        while conn_states.changed().await.is_ok() {
            let state = *conn_states.borrow();
            info!(state = %state, "connection state changed");
        }
    });

    client.ensure_connected();

    // Re-validate any cached trade-confirmation token against the backend;
    // a revoked token must not skip the confirmation step. Verification
    // failing over HTTP is not fatal, the order path asks again.
    match client.verify_session().await {
        Ok(true) => info!("cached session token verified"),
        Ok(false) => info!("no valid session token, orders will require confirmation"),
        Err(err) => warn!(error = %err, "session token verification failed, continuing"),
    }

    wait_for_shutdown().await;
    info!("shutting down");
    client.shutdown();

    // Give the connection task a moment to close the socket cleanly
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    Ok(())
}

/// Block until SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
