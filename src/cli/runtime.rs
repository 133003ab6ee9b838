use std::path::PathBuf;

use anyhow::{Context, Result};
use soulbrowser_resilience::ResilienceConfig;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

/// Config file (explicit or default location), environment, then the
/// `--storage-dir` flag
pub fn load_config(
    config_path: Option<&PathBuf>,
    storage_dir: Option<&PathBuf>,
) -> Result<ResilienceConfig> {
    let mut config = ResilienceConfig::load(config_path.map(PathBuf::as_path))
        .context("Failed to load resilience configuration")?;
    if let Some(dir) = storage_dir {
        info!("Using storage directory from command line: {}", dir.display());
        config.storage_dir = Some(dir.clone());
    }
    match &config.storage_dir {
        Some(dir) => debug!("Snapshot documents under {}", dir.display()),
        None => debug!("No storage directory configured; stores are in-memory"),
    }
    Ok(config)
}
