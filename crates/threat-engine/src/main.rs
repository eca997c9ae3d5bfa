//! Threat engine service.
//!
//! Usage:
//!   threat-engine serve                      - Run the HTTP API
//!   threat-engine replay <observations.jsonl> - Fold a recorded stream through the pipeline

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use threat_engine::{
    api, replay, sink::SinkSet, ThreatEngineConfig, ThreatEngineState, ThreatPipeline,
};
use tokio::{net::TcpListener, sync::Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "threat-engine")]
#[command(about = "Proximity clustering and threat assessment for tracked people", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Node identifier reported by health endpoints and logs
    #[arg(long, env = "NODE_ID")]
    node_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve {
        /// Listen address, overrides THREAT_ENGINE_ADDR
        #[arg(long)]
        bind: Option<String>,
    },

    /// Replay recorded observations (JSON Lines) and write the logs
    Replay {
        /// Input file, one frame of observations per line
        path: PathBuf,

        /// Frames per tick, overrides FRAMES_PER_TICK
        #[arg(long)]
        frames_per_tick: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = telemetry::init_with_service("threat-engine");

    let cli = Cli::parse();
    let node_id = cli.node_id.unwrap_or_else(|| {
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| format!("threat-engine-{}", uuid::Uuid::new_v4()))
    });

    let mut config = ThreatEngineConfig::from_env().context("invalid configuration")?;

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            serve(config, node_id).await
        }
        Commands::Replay {
            path,
            frames_per_tick,
        } => {
            if let Some(frames_per_tick) = frames_per_tick {
                config.frames_per_tick = frames_per_tick;
            }
            run_replay(config, path).await
        }
    }
}

async fn serve(config: ThreatEngineConfig, node_id: String) -> Result<()> {
    info!(
        bind = %config.bind_addr,
        node_id = %node_id,
        camera_id = %config.camera_id,
        frames_per_tick = config.frames_per_tick,
        "starting threat engine"
    );

    let sinks = SinkSet::from_config(&config).context("failed to open report sinks")?;
    let bind_addr = config.bind_addr.clone();
    let pipeline = ThreatPipeline::new(config, sinks)?;
    info!(sinks = ?pipeline.sink_names(), "report sinks ready");

    let state = ThreatEngineState::new(node_id, Arc::new(Mutex::new(pipeline)));
    let app = api::router(state.clone());

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("threat engine listening on {}", bind_addr);

    let cancel = CancellationToken::new();
    tokio::spawn(watch_signals(cancel.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await?;

    if let Err(e) = state.shutdown().await {
        error!(error = %e, "error during shutdown");
    }
    Ok(())
}

async fn run_replay(config: ThreatEngineConfig, path: PathBuf) -> Result<()> {
    let sinks = SinkSet::from_config(&config).context("failed to open report sinks")?;
    let mut pipeline = ThreatPipeline::new(config, sinks)?;

    let cancel = CancellationToken::new();
    tokio::spawn(watch_signals(cancel.clone()));

    let summary = replay::replay_file(&path, &mut pipeline, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn watch_signals(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C signal"),
        _ = terminate => info!("received terminate signal"),
    }

    info!("shutting down gracefully...");
    cancel.cancel();
}
