// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Herald Server - Operator console for bulk outbound messaging.
//!
//! The server is responsible for:
//! - Campaign intake, validation, and execution
//! - Event fan-out to supervising consoles
//! - Chat bookkeeping (history, unread counts, active chat)
//!
//! Note: the messaging-network session itself (pairing, credentials,
//! reconnects) is handled by the session gateway sidecar.

use anyhow::Result;
use tracing::{error, info};

use herald_server::config::ServerConfig;
use herald_server::server;
use herald_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("herald_server=info".parse().unwrap())
                .add_directive("herald_core=info".parse().unwrap()),
        )
        .init();

    info!("Starting Herald Server");

    // Load configuration
    let config = ServerConfig::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        addr = %config.bind_addr,
        gateway = config.gateway_url.as_deref().unwrap_or("(in-memory channel)"),
        pacing_ms = config.engine.pacing_delay.as_millis() as u64,
        "Configuration loaded"
    );

    let state = AppState::new(&config);

    info!("Herald Server initialized successfully");

    server::run_server(config.bind_addr, state).await?;

    info!("Shutdown complete");
    Ok(())
}
