//! Core types for the content gateway

use gdrive_client::Credentials;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration for the gateway, loaded once at startup
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_address: SocketAddr,
    pub default_root_id: String,
    pub credentials: Credentials,
    pub overrides_path: Option<PathBuf>,
}
