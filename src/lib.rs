pub mod cli;
pub mod core;
pub mod providers;
pub mod server;

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::config::AppConfig;

/// Loads the config from `config_path`, or from the default location.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
}

pub async fn run(config: AppConfig) -> Result<()> {
    info!("Currency conversion proxy starting...");
    debug!("Loaded config: {config:#?}");

    let provider = providers::ExchangeRateApiProvider::new(
        &config.provider.base_url,
        config.provider.timeout(),
    )?;

    server::serve(&config.server, Arc::new(provider)).await
}
