// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Outbound channel trait definitions.
//!
//! Defines the abstract interface for the per-message send primitive and
//! connectivity signal of a messaging-network session.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Errors from outbound channel operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChannelError {
    /// The session to the messaging network is down.
    ///
    /// This is the only campaign-fatal variant: the executor aborts the
    /// remaining plan when a send fails with it.
    #[error("channel is not connected")]
    NotConnected,

    /// The network accepted the request but refused the send.
    #[error("send rejected: {0}")]
    Rejected(String),

    /// Transport-level failure (I/O, protocol, timeout inside the channel).
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChannelError {
    /// Whether this failure means the whole session is gone.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ChannelError::NotConnected)
    }
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// A recipient identifier in the channel's wire format.
///
/// Produced by [`crate::resolver::RecipientResolver::resolve`]; bare digit
/// strings get the session's domain suffix appended, identifiers that already
/// carry an `@` pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelAddress(String);

impl ChannelAddress {
    /// Wrap an already-normalized address.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address as the channel expects it on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a single send call.
///
/// A send is only counted as delivered-to-network when the channel handed
/// back a message identifier; anything else is treated as a failed task.
#[derive(Debug, Clone, Default)]
pub struct SendReceipt {
    /// Identifier the network assigned to the message, if any.
    pub message_id: Option<String>,
    /// Channel-specific delivery status code, if reported.
    pub status: Option<i64>,
}

impl SendReceipt {
    /// Whether the channel confirmed the send with a message identifier.
    pub fn confirmed(&self) -> bool {
        self.message_id.is_some()
    }
}

/// Trait for outbound messaging channels.
///
/// Channels wrap one persistent session to a messaging network. Different
/// implementations can talk to a session gateway over HTTP, hold an in-memory
/// fake for tests, etc.
///
/// Channels are PURE transport - they do NOT pace, validate recipients, or
/// track campaign state. All of that is handled by the executor.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    /// Channel type identifier (e.g., "gateway", "memory").
    fn channel_type(&self) -> &'static str;

    /// Whether the underlying session is currently connected.
    async fn is_connected(&self) -> bool;

    /// Send a text message to a recipient.
    async fn send_text(&self, address: &ChannelAddress, text: &str) -> Result<SendReceipt>;

    /// Send an image to a recipient.
    async fn send_image(
        &self,
        address: &ChannelAddress,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<SendReceipt>;

    /// Check whether a raw number is registered on the network.
    ///
    /// Returns `Ok(None)` when the channel cannot perform the check. Callers
    /// must treat both `Ok(None)` and `Err(_)` as "unknown" and proceed
    /// optimistically; only `Ok(Some(false))` blocks sends.
    async fn check_registered(&self, raw_number: &str) -> Result<Option<bool>> {
        let _ = raw_number;
        Ok(None)
    }
}
