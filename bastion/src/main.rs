//! Bastion binary.
use std::path::Path;

use anyhow::Context;
use bastion::BastionServer;
use bastion::config::{BastionConfig, CONFIG_PATH};
use bastion::logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BastionConfig::load_or_create(Path::new(CONFIG_PATH))
        .with_context(|| format!("failed to load {CONFIG_PATH}"))?;
    logger::init(&config.log_filter).context("failed to initialise logging")?;

    let mut server = BastionServer::new(config)?;
    server.start()?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    log::info!("Shutdown requested");
    server.stop().await?;
    Ok(())
}
