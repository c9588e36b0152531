// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Server configuration from environment variables.

use std::net::SocketAddr;

use herald_core::config::EngineConfig;

/// Herald server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP bind address for the operator console.
    pub bind_addr: SocketAddr,
    /// Base URL of the session gateway sidecar. When unset the server runs
    /// against the in-memory channel (local operation, no real network).
    pub gateway_url: Option<String>,
    /// Campaign engine knobs.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `HERALD_PORT`: HTTP port (default: 3000)
    /// - `HERALD_GATEWAY_URL`: session gateway base URL (default: in-memory channel)
    ///
    /// Engine variables are documented on [`EngineConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let port: u16 = std::env::var("HERALD_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HERALD_PORT", "must be a valid port number"))?;

        let gateway_url = std::env::var("HERALD_GATEWAY_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            gateway_url,
            engine: EngineConfig::from_env()?,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),

    /// The engine configuration failed to load.
    #[error(transparent)]
    Engine(#[from] herald_core::config::ConfigError),
}
