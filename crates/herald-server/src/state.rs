// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared server state and observer fan-out.
//!
//! One `AppState` exists per process and is cloned into every handler. It
//! owns the session context (and with it the campaign busy latch), the chat
//! store, the connection watch flag, and the broadcast channel every
//! WebSocket observer subscribes to. Observers are fire-and-forget: a slow
//! or absent console drops events, it never backpressures the engine.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, watch};

use herald_core::channel::{MemoryChannel, OutboundChannel};
use herald_core::events::{CampaignEvent, EventSink};
use herald_core::executor::CampaignExecutor;
use herald_core::session::SessionContext;

use crate::chats::{Chat, ChatMessage, ChatStore};
use crate::config::ServerConfig;
use crate::gateway::HttpGateway;

/// Broadcast capacity; observers that lag behind this many events miss them.
const EVENT_BUFFER: usize = 256;

/// One frame on the observer stream, serialized as `{"event", "data"}`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerEvent {
    /// Campaign engine events, forwarded verbatim.
    Campaign(CampaignEvent),
    /// Server-side notices (connection, chats).
    Notice(NoticeEvent),
}

/// Server-side notices for consoles.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum NoticeEvent {
    /// The session's connection state changed.
    Connected {
        /// Whether the session is up.
        connected: bool,
    },
    /// Operator-facing warning (e.g. disconnect during a bulk send).
    Error {
        /// Human-readable message.
        message: String,
    },
    /// The chat list, sent to observers when they join.
    ChatsLoaded(Vec<Chat>),
    /// A chat's row changed (new message, unread bump).
    ChatUpdated(Chat),
    /// A message arrived for the active chat.
    NewMessage(ChatMessage),
}

/// Event sink that fans campaign events out to every observer.
pub struct BroadcastSink {
    tx: broadcast::Sender<ServerEvent>,
}

impl BroadcastSink {
    /// Wrap a broadcast sender.
    pub fn new(tx: broadcast::Sender<ServerEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: CampaignEvent) {
        // No receivers is fine; observers are optional.
        let _ = self.tx.send(ServerEvent::Campaign(event));
    }
}

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The messaging session (channel + sink + busy latch).
    pub session: Arc<SessionContext>,
    /// The campaign executor bound to the session.
    pub executor: Arc<CampaignExecutor>,
    /// Chat bookkeeping.
    pub chats: Arc<ChatStore>,
    /// Observer fan-out channel.
    pub events: broadcast::Sender<ServerEvent>,
    /// Connection flag fed by the gateway webhook.
    pub connection: watch::Sender<bool>,
    /// When the server started (for uptime calculation).
    pub start_time: Instant,
    /// Server version string.
    pub version: String,
}

impl AppState {
    /// Build the server state from configuration.
    ///
    /// With a gateway URL configured the channel talks to the sidecar and
    /// starts disconnected until the sidecar reports in; without one the
    /// server runs on the in-memory channel for local operation.
    pub fn new(config: &ServerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (connection, connection_rx) = watch::channel(config.gateway_url.is_none());

        let channel: Arc<dyn OutboundChannel> = match &config.gateway_url {
            Some(url) => Arc::new(HttpGateway::new(url.clone(), connection_rx)),
            None => Arc::new(MemoryChannel::new()),
        };

        let sink = Arc::new(BroadcastSink::new(events.clone()));
        let session = Arc::new(SessionContext::new(channel, sink, config.engine.clone()));
        let executor = Arc::new(CampaignExecutor::new(session.clone()));

        Self {
            session,
            executor,
            chats: Arc::new(ChatStore::new()),
            events,
            connection,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Broadcast a server notice to every observer.
    pub fn notify(&self, notice: NoticeEvent) {
        let _ = self.events.send(ServerEvent::Notice(notice));
    }

    /// Server uptime in milliseconds.
    pub fn uptime_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }
}
