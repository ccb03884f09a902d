//! Streaming video player client - main entry point
//!
//! Connects the control channel and unit delivery socket, wires the session
//! controller to the playback engine, and drives both from a small
//! interactive command loop (play / pause / quit).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use svp_client::net::{RtpUnitSource, RtspTransport};
use svp_client::playback::PlaybackEngine;
use svp_client::session::SessionController;
use svp_common::config::{self, PlayerConfig};

/// Command-line arguments for svp-client
#[derive(Parser, Debug)]
#[command(name = "svp-client")]
#[command(about = "Streaming video player client")]
#[command(version)]
struct Args {
    /// Media stream to request from the server
    media: String,

    /// Session-control server host
    #[arg(short, long)]
    server: Option<String>,

    /// Session-control server port
    #[arg(short, long, env = "SVP_PORT")]
    port: Option<u16>,

    /// Local UDP port for unit delivery
    #[arg(long, env = "SVP_RTP_PORT")]
    rtp_port: Option<u16>,

    /// Path to a TOML config file
    #[arg(short, long, env = "SVP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "svp_client=info,svp_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let player_config = PlayerConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    let host = config::resolve_server_host(args.server.as_deref(), "SVP_SERVER", &player_config);
    let port = args.port.unwrap_or(player_config.server_port);
    let rtp_port = args.rtp_port.unwrap_or(player_config.rtp_port);

    info!(
        "Starting SVP client: stream {} from {}:{}, delivery port {}",
        args.media, host, port, rtp_port
    );

    // Wire the session controller to the playback engine
    let control = RtspTransport::connect(&host, port)
        .await
        .context("Failed to connect to media server")?;
    let units = RtpUnitSource::new(rtp_port);
    let (unit_tx, unit_rx) = mpsc::channel(64);
    let session = SessionController::new(control, units, args.media, rtp_port, unit_tx);

    let session_events = session.events();
    let engine = Arc::new(PlaybackEngine::new(
        session,
        player_config.buffer_capacity,
        Duration::from_millis(player_config.frame_interval_ms),
    ));
    let _intake = engine.start_intake(unit_rx);

    // Surface observable events in the log
    let mut session_rx = session_events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = session_rx.recv().await {
            debug!(?event, "session event");
        }
    });
    let mut player_rx = engine.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = player_rx.recv().await {
            debug!(?event, "player event");
        }
    });

    println!("commands: play, pause, quit");
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            line = input.next_line() => {
                match line?.as_deref().map(str::trim) {
                    Some("play") => match engine.play().await {
                        Ok(0) | Ok(200) => {}
                        Ok(status) => warn!("server rejected playback with status {}", status),
                        Err(e) => warn!("play failed: {}", e),
                    },
                    Some("pause") => engine.pause().await,
                    Some("quit") | None => break,
                    Some("") => {}
                    Some(other) => println!("unknown command: {}", other),
                }
            }
        }
    }

    info!("Tearing down session");
    if let Err(e) = engine.stop().await {
        warn!("teardown failed: {}", e);
    }
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
