// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Session gateway adapter.
//!
//! The persistent session to the messaging network (pairing, credentials,
//! reconnects) lives in a sidecar gateway. This module adapts that sidecar's
//! HTTP surface to the engine's [`OutboundChannel`] capability and defines
//! the webhook payloads the sidecar reports back through.
//!
//! Connectivity is push-based: the sidecar posts status changes to
//! `/api/gateway/events` and the adapter reads the resulting watch flag
//! instead of probing the sidecar on every liveness check.

use async_trait::async_trait;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use herald_core::channel::{ChannelAddress, ChannelError, OutboundChannel, SendReceipt};

use crate::chats::MessageKind;

/// Outbound channel over a session gateway sidecar.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    connected: watch::Receiver<bool>,
}

impl HttpGateway {
    /// Create an adapter for the sidecar at `base_url`.
    pub fn new(base_url: impl Into<String>, connected: watch::Receiver<bool>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            connected,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn transport(e: reqwest::Error) -> ChannelError {
    ChannelError::Transport(e.to_string())
}

#[derive(Serialize)]
struct SendTextBody<'a> {
    to: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendImageBody<'a> {
    to: &'a str,
    mime_type: &'a str,
    bytes: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    message_id: Option<String>,
    status: Option<i64>,
}

#[derive(Deserialize)]
struct RegisteredResponse {
    registered: bool,
}

impl From<SendResponse> for SendReceipt {
    fn from(resp: SendResponse) -> Self {
        SendReceipt {
            message_id: resp.message_id,
            status: resp.status,
        }
    }
}

#[async_trait]
impl OutboundChannel for HttpGateway {
    fn channel_type(&self) -> &'static str {
        "gateway"
    }

    async fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    async fn send_text(&self, address: &ChannelAddress, text: &str) -> Result<SendReceipt, ChannelError> {
        let resp = self
            .http
            .post(self.url("/send/text"))
            .json(&SendTextBody {
                to: address.as_str(),
                text,
            })
            .send()
            .await
            .map_err(transport)?;

        match resp.status() {
            StatusCode::SERVICE_UNAVAILABLE => Err(ChannelError::NotConnected),
            status if !status.is_success() => {
                Err(ChannelError::Rejected(format!("gateway returned {status}")))
            }
            _ => Ok(resp
                .json::<SendResponse>()
                .await
                .map_err(transport)?
                .into()),
        }
    }

    async fn send_image(
        &self,
        address: &ChannelAddress,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<SendReceipt, ChannelError> {
        let resp = self
            .http
            .post(self.url("/send/image"))
            .json(&SendImageBody {
                to: address.as_str(),
                mime_type,
                bytes: base64::engine::general_purpose::STANDARD.encode(bytes),
            })
            .send()
            .await
            .map_err(transport)?;

        match resp.status() {
            StatusCode::SERVICE_UNAVAILABLE => Err(ChannelError::NotConnected),
            status if !status.is_success() => {
                Err(ChannelError::Rejected(format!("gateway returned {status}")))
            }
            _ => Ok(resp
                .json::<SendResponse>()
                .await
                .map_err(transport)?
                .into()),
        }
    }

    async fn check_registered(&self, raw_number: &str) -> Result<Option<bool>, ChannelError> {
        let resp = self
            .http
            .get(self.url(&format!("/registered/{raw_number}")))
            .send()
            .await
            .map_err(transport)?;

        match resp.status() {
            // The sidecar does not support the check.
            StatusCode::NOT_FOUND | StatusCode::NOT_IMPLEMENTED => Ok(None),
            status if !status.is_success() => Err(ChannelError::Transport(format!(
                "registration check returned {status}"
            ))),
            _ => {
                let body: RegisteredResponse = resp.json().await.map_err(transport)?;
                Ok(Some(body.registered))
            }
        }
    }
}

/// One notification posted by the session gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayNotice {
    /// The session's connection state changed.
    Status {
        /// Whether the session is up.
        connected: bool,
    },
    /// An inbound message arrived on the session.
    Message(InboundMessage),
}

/// An inbound message reported by the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Sender identifier (address or bare number).
    pub from: String,
    /// Message body or media placeholder.
    pub body: String,
    /// Message kind; defaults to text.
    #[serde(default)]
    pub kind: MessageKind,
}
