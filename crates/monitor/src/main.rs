//! Drowsiness Monitor - Main Entry Point

use monitor::{get_configuration, init_logging, run};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration()?;
    init_logging(config.log_level, config.log_format)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Detection service: {}", config.inference.base_url);

    run(config).await
}
