// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Chat bookkeeping.
//!
//! Process-lifetime map of chats and their message history. Outbound sends
//! and gateway-ingested inbound messages are both recorded here so the
//! console can render conversations; nothing is persisted.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

/// Domain suffix of group chats on the network.
const GROUP_DOMAIN: &str = "@g.us";

/// What a message carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text.
    #[default]
    Text,
    /// An image.
    Image,
    /// A video.
    Video,
    /// An audio clip.
    Audio,
    /// A document attachment.
    Document,
    /// Other media.
    Media,
}

/// One chat row in the console's chat list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// The chat's channel address.
    pub id: String,
    /// Display name, when the network provided one.
    pub name: Option<String>,
    /// Whether this is a group chat.
    pub is_group: bool,
    /// Messages received while the chat was not active.
    pub unread: u32,
    /// Body of the latest message.
    pub last_message: Option<String>,
    /// When the latest message arrived.
    pub last_activity: Option<DateTime<Utc>>,
}

/// One message in a chat's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned record id.
    pub id: String,
    /// The chat this message belongs to.
    pub chat_id: String,
    /// Display name of the sender.
    pub sender: String,
    /// Message body (or a media placeholder).
    pub body: String,
    /// Message kind.
    pub kind: MessageKind,
    /// When the message was recorded.
    pub timestamp: DateTime<Utc>,
    /// True for messages this operator sent.
    pub from_me: bool,
}

/// In-memory chat store.
#[derive(Debug, Default)]
pub struct ChatStore {
    chats: DashMap<String, Chat>,
    messages: DashMap<String, Vec<ChatMessage>>,
    active: RwLock<Option<String>>,
}

impl ChatStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip the domain suffix off an address for display.
    pub fn format_number(address: &str) -> &str {
        address.split('@').next().unwrap_or(address)
    }

    /// Display name for an address: the chat's name when known, the bare
    /// number otherwise, with groups labeled as such.
    pub fn display_name(&self, address: &str) -> String {
        if let Some(chat) = self.chats.get(address)
            && let Some(name) = &chat.name
        {
            return name.clone();
        }
        if address.ends_with(GROUP_DOMAIN) {
            format!("Group {}", Self::format_number(address))
        } else {
            Self::format_number(address).to_string()
        }
    }

    /// The currently active chat, if any.
    pub fn active(&self) -> Option<String> {
        self.active.read().expect("chat store poisoned").clone()
    }

    /// Mark a chat active and clear its unread counter.
    pub fn set_active(&self, address: &str) {
        *self.active.write().expect("chat store poisoned") = Some(address.to_string());
        if let Some(mut chat) = self.chats.get_mut(address) {
            chat.unread = 0;
        }
    }

    /// Record a message the operator sent.
    pub fn record_outgoing(&self, address: &str, body: &str) -> ChatMessage {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            chat_id: address.to_string(),
            sender: self.display_name(address),
            body: body.to_string(),
            kind: MessageKind::Text,
            timestamp: Utc::now(),
            from_me: true,
        };
        self.push_message(address, message.clone(), false);
        message
    }

    /// Record a message received from the network.
    ///
    /// Bumps the unread counter unless the chat is active.
    pub fn record_incoming(&self, address: &str, body: &str, kind: MessageKind) -> ChatMessage {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            chat_id: address.to_string(),
            sender: self.display_name(address),
            body: body.to_string(),
            kind,
            timestamp: Utc::now(),
            from_me: false,
        };
        let unread = self.active().as_deref() != Some(address);
        self.push_message(address, message.clone(), unread);
        message
    }

    fn push_message(&self, address: &str, message: ChatMessage, count_unread: bool) {
        {
            let mut chat = self.chats.entry(address.to_string()).or_insert_with(|| Chat {
                id: address.to_string(),
                name: None,
                is_group: address.ends_with(GROUP_DOMAIN),
                unread: 0,
                last_message: None,
                last_activity: None,
            });
            chat.last_message = Some(message.body.clone());
            chat.last_activity = Some(message.timestamp);
            if count_unread {
                chat.unread += 1;
            }
        }
        self.messages
            .entry(address.to_string())
            .or_default()
            .push(message);
    }

    /// Whether a chat exists.
    pub fn contains(&self, address: &str) -> bool {
        self.chats.contains_key(address)
    }

    /// One chat's row, if it exists.
    pub fn chat(&self, address: &str) -> Option<Chat> {
        self.chats.get(address).map(|c| c.clone())
    }

    /// Every chat, most recent activity first.
    pub fn chat_list(&self) -> Vec<Chat> {
        let mut chats: Vec<Chat> = self.chats.iter().map(|c| c.clone()).collect();
        chats.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        chats
    }

    /// A chat's message history in arrival order.
    pub fn messages(&self, address: &str) -> Option<Vec<ChatMessage>> {
        self.messages.get(address).map(|m| m.clone())
    }
}
