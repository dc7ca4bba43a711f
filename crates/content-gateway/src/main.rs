//! Content-delivery gateway over Drive-backed storage
//!
//! Resolves flat URL paths to remote file ids and streams the bytes back
//! with uniform, cache-friendly headers. Named routing tags can be diverted
//! to alternate upstreams by redirect or transparent proxy.

mod error;
mod metrics;
mod overrides;
mod server;
mod shape;
mod types;

use crate::error::{GatewayError, Result};
use crate::overrides::parse_overrides;
use crate::server::{start_server, ServerState, SharedState};
use crate::types::GatewayConfig;
use gdrive_client::{Credentials, DriveClient};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("content_gateway=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    info!("Starting content gateway...");

    let config = load_config()?;
    info!("Listen address: {}", config.listen_address);
    info!("Default root id: {}", config.default_root_id);

    let overrides = match &config.overrides_path {
        Some(path) => parse_overrides(&std::fs::read_to_string(path)?),
        None => HashMap::new(),
    };
    info!("Loaded {} upstream overrides", overrides.len());

    let drive = DriveClient::new(config.credentials.clone(), false);
    let state: SharedState = Arc::new(ServerState::new(
        drive,
        overrides,
        config.default_root_id.clone(),
    ));

    // Start HTTP server (blocking)
    start_server(state, config.listen_address).await?;

    Ok(())
}

fn load_config() -> Result<GatewayConfig> {
    let listen_address = std::env::var("LISTEN_ADDRESS")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()?;

    let credentials = Credentials {
        client_id: required_env("GD_CLIENT_ID")?,
        client_secret: required_env("GD_CLIENT_SECRET")?,
        refresh_token: required_env("GD_REFRESH_TOKEN")?,
    };
    let default_root_id = required_env("GD_DEFAULT_ROOT_ID")?;

    let overrides_path = std::env::var("OVERRIDES_FILE").ok().map(PathBuf::from);

    Ok(GatewayConfig {
        listen_address,
        default_root_id,
        credentials,
        overrides_path,
    })
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| GatewayError::Config(format!("{} is required", name)))
}
