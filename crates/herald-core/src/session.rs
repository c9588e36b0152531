// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Session context.
//!
//! One `SessionContext` exists per messaging-network session and is shared by
//! every component that touches it. It owns the non-reentrancy latch: at most
//! one campaign may be in flight per session, and the latch is released on
//! every exit path, including panics, via a scoped guard.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::channel::OutboundChannel;
use crate::config::EngineConfig;
use crate::error::CampaignError;
use crate::events::EventSink;

/// Shared state for one messaging-network session.
pub struct SessionContext {
    channel: Arc<dyn OutboundChannel>,
    sink: Arc<dyn EventSink>,
    config: EngineConfig,
    busy: AtomicBool,
}

impl SessionContext {
    /// Create a session context around a channel and an event sink.
    pub fn new(
        channel: Arc<dyn OutboundChannel>,
        sink: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            channel,
            sink,
            config,
            busy: AtomicBool::new(false),
        }
    }

    /// The session's outbound channel.
    pub fn channel(&self) -> &Arc<dyn OutboundChannel> {
        &self.channel
    }

    /// The session's event sink.
    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a campaign is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Claim the session for one campaign.
    ///
    /// Fails with [`CampaignError::CampaignAlreadyRunning`] when another
    /// campaign holds the latch. The returned guard releases it on drop.
    pub(crate) fn try_acquire(&self) -> Result<BusyGuard<'_>, CampaignError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CampaignError::CampaignAlreadyRunning);
        }
        Ok(BusyGuard { flag: &self.busy })
    }
}

/// Scoped hold on the session's busy latch.
pub(crate) struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
