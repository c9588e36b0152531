// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Recipient resolution.
//!
//! Normalizes raw recipient identifiers into channel addresses and runs the
//! optional registration pre-check. Resolution never fails; a pre-check that
//! cannot be performed is an `Unknown`, not an error, so a flaky check can
//! never block a campaign.

use std::sync::Arc;
use tracing::warn;

use crate::channel::{ChannelAddress, OutboundChannel};

/// Outcome of a registration pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The network confirmed the number exists.
    Registered,
    /// The network confirmed the number does NOT exist.
    Unregistered,
    /// The check is unsupported or itself failed; proceed optimistically.
    Unknown,
}

impl Registration {
    /// Whether sends to this recipient should be attempted.
    ///
    /// Only a confirmed negative blocks; `Unknown` passes.
    pub fn allows_send(&self) -> bool {
        !matches!(self, Registration::Unregistered)
    }
}

/// Normalizes recipient numbers and pre-validates registration.
pub struct RecipientResolver {
    domain: String,
    channel: Arc<dyn OutboundChannel>,
}

impl RecipientResolver {
    /// Create a resolver for the given address domain.
    pub fn new(domain: impl Into<String>, channel: Arc<dyn OutboundChannel>) -> Self {
        Self {
            domain: domain.into(),
            channel,
        }
    }

    /// The domain suffix appended to bare numbers.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Normalize a raw number into a channel address.
    ///
    /// Identifiers that already carry the address delimiter pass through
    /// unchanged; bare numbers get the domain suffix appended.
    pub fn resolve(&self, raw: &str) -> ChannelAddress {
        if raw.contains('@') {
            ChannelAddress::new(raw)
        } else {
            ChannelAddress::new(format!("{raw}@{}", self.domain))
        }
    }

    /// Check whether a raw number is registered on the network.
    ///
    /// Delegates to the channel's optional capability. An unsupported or
    /// failing check resolves to [`Registration::Unknown`].
    pub async fn check_registered(&self, raw: &str) -> Registration {
        match self.channel.check_registered(raw).await {
            Ok(Some(true)) => Registration::Registered,
            Ok(Some(false)) => Registration::Unregistered,
            Ok(None) => Registration::Unknown,
            Err(e) => {
                warn!(number = %raw, error = %e, "Registration check failed, proceeding optimistically");
                Registration::Unknown
            }
        }
    }
}
