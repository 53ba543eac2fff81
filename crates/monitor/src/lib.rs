//! Drowsiness Monitor
//!
//! Wires the replay camera, the remote detector client, the bell alert and the
//! console status line into one capture session.

pub mod config;
pub mod console;

pub use config::{get_configuration, LogFormat, LogLevel, MonitorConfig};
pub use console::{BellAlertSink, ConsoleStatus};

use alerting::AlertStateMachine;
use anyhow::Context;
use camera_capture::ReplaySource;
use dms::CaptureSession;
use inference_client::InferenceClient;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging; `RUST_LOG` overrides the configured level
pub fn init_logging(level: LogLevel, format: LogFormat) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_level(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    }
    .context("Failed to set tracing subscriber")
}

/// Run a capture session until Ctrl-C or SIGTERM
pub async fn run(config: MonitorConfig) -> anyhow::Result<()> {
    let client = InferenceClient::new(&config.inference)
        .context("Failed to create detection service client")?;
    let source = ReplaySource::new(&config.camera);

    let sink = BellAlertSink::spawn(config.alert.bell_interval(), std::io::stdout());
    let alert = AlertStateMachine::new(sink, &config.alert.alert_config());

    let session = CaptureSession::start(
        source,
        config.camera.lens,
        Arc::new(client),
        alert,
        ConsoleStatus::stdout(),
        &config.session_config(),
    )
    .context("Failed to start capture session")?;

    shutdown_signal().await;
    info!("Shutdown signal received, stopping capture session.");

    let parts = session.stop().await?;
    info!(
        delivered = parts.stats.delivered,
        dropped_busy = parts.stats.dropped_busy,
        extraction_failed = parts.stats.extraction_failed,
        submitted = parts.stats.submitted,
        completed = parts.stats.completed,
        discarded_late = parts.stats.discarded_late,
        "Session summary"
    );

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
