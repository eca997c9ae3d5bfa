use alert_service::{
    create_router, read_alerts, AlertDispatcher, AlertServiceConfig, AlertTimeline, AppState,
};
use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = telemetry::init_with_service("alert-service");

    let config = AlertServiceConfig::from_env().context("invalid configuration")?;

    info!("Starting alert-service");
    info!("Bind address: {}", config.bind_addr);

    let records = match &config.csv_path {
        Some(path) => match read_alerts(path) {
            Ok(records) => {
                info!(path = %path.display(), alerts = records.len(), "incident log loaded");
                records
            }
            Err(e) => {
                warn!(error = %e, "could not load incident log, starting with an empty timeline");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let state = AppState::new(
        AlertTimeline::new(records, config.window),
        AlertDispatcher::default(),
    );
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind to address")?;

    info!("Alert service listening on {}", config.bind_addr);

    let cancel = CancellationToken::new();
    tokio::spawn(watch_signals(cancel.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .context("Server error")?;

    Ok(())
}

async fn watch_signals(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        return;
    }
    info!("shutting down gracefully...");
    cancel.cancel();
}
