pub mod badge;
pub mod core;
pub mod label;
pub mod providers;
pub mod server;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("quotebadge starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let state = Arc::new(server::AppState::from_config(&config, AppConfig::api_token()));
    let app = server::router(state, &config.image_route());

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen))?;
    info!("Serving badge for {} at {}", config.symbol, config.image_route());

    server::serve(listener, app).await.context("Server error")
}
