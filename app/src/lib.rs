//! Meadow node library

use std::path::PathBuf;

use anyhow::Context;
use meadow_api::AppState;
use meadow_core::AppConfig;

/// Environment variable naming a JSON config file
pub const CONFIG_ENV: &str = "MEADOW_CONFIG";

/// Load the config named by `MEADOW_CONFIG`, or the defaults when unset
pub fn load_config() -> anyhow::Result<AppConfig> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            tracing::info!("Loading config from {}", path.display());
            AppConfig::load(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => {
            tracing::info!("{} not set, using default config", CONFIG_ENV);
            Ok(AppConfig::default())
        }
    }
}

/// Run the node
pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("meadow=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    tracing::info!("Starting Meadow");

    let config = load_config()?;
    let state = AppState::new(config).context("failed to set up exchange")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime
        .block_on(meadow_api::start_server(state))
        .context("API server stopped")?;
    Ok(())
}
