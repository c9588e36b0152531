// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Herald Server - Operator console for bulk outbound messaging.
//!
//! Exposes the campaign engine to supervising web clients:
//!
//! - `POST /api/campaigns` validates and starts a campaign
//! - `GET /ws` streams campaign events and chat/connection notices
//! - `GET /api/status` is the snapshot late-joining observers resync from
//! - `/api/chats/*` is the conversational surface (list, history, send)
//! - `POST /api/gateway/events` is the webhook the session gateway reports
//!   connection changes and inbound messages through
//!
//! The messaging-network session itself lives in a sidecar gateway; this
//! server holds the campaign state machine, the chat bookkeeping, and the
//! observer fan-out.

pub mod chats;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod server;
pub mod state;
pub mod ws;
