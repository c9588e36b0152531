// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::time::Duration;

/// Default wait between consecutive sends. The dominant wall-clock cost of a
/// campaign; exists purely to respect the network's anti-flood throttling.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(15_000);

/// Default interval (in completed tasks) between connectivity probes.
pub const DEFAULT_LIVENESS_PROBE_EVERY: u32 = 5;

/// Default domain suffix appended to bare recipient numbers.
pub const DEFAULT_ADDRESS_DOMAIN: &str = "s.whatsapp.net";

/// Campaign engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed wait enforced after every task, success or failure.
    pub pacing_delay: Duration,
    /// Probe channel connectivity every N completed tasks (0 disables probing).
    pub liveness_probe_every: u32,
    /// Domain suffix appended to recipient numbers that carry no `@`.
    pub address_domain: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pacing_delay: DEFAULT_PACING_DELAY,
            liveness_probe_every: DEFAULT_LIVENESS_PROBE_EVERY,
            address_domain: DEFAULT_ADDRESS_DOMAIN.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `HERALD_PACING_DELAY_MS`: wait between sends in milliseconds (default: 15000)
    /// - `HERALD_LIVENESS_PROBE_EVERY`: probe interval in tasks (default: 5)
    /// - `HERALD_ADDRESS_DOMAIN`: suffix for bare numbers (default: s.whatsapp.net)
    pub fn from_env() -> Result<Self, ConfigError> {
        let pacing_ms: u64 = std::env::var("HERALD_PACING_DELAY_MS")
            .unwrap_or_else(|_| "15000".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("HERALD_PACING_DELAY_MS", "must be milliseconds")
            })?;

        let liveness_probe_every: u32 = std::env::var("HERALD_LIVENESS_PROBE_EVERY")
            .unwrap_or_else(|_| DEFAULT_LIVENESS_PROBE_EVERY.to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid(
                    "HERALD_LIVENESS_PROBE_EVERY",
                    "must be a non-negative integer",
                )
            })?;

        let address_domain = std::env::var("HERALD_ADDRESS_DOMAIN")
            .unwrap_or_else(|_| DEFAULT_ADDRESS_DOMAIN.to_string());
        if address_domain.is_empty() || address_domain.contains('@') {
            return Err(ConfigError::Invalid(
                "HERALD_ADDRESS_DOMAIN",
                "must be a bare domain without '@'",
            ));
        }

        Ok(Self {
            pacing_delay: Duration::from_millis(pacing_ms),
            liveness_probe_every,
            address_domain,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
