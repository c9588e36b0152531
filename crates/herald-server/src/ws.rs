// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! WebSocket fan-out to supervising consoles.
//!
//! Each observer gets a broadcast subscription opened at join time; events
//! emitted before that are gone (late joiners resynchronize from the status
//! snapshot). A console that cannot keep up is skipped past the events it
//! missed rather than backpressuring the engine.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::state::{AppState, NoticeEvent, ServerEvent};

/// Handle a console WebSocket upgrade.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one observer connection until it closes.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("Console observer connected");

    // Subscribe before the snapshot so nothing emitted in between is lost.
    let mut events = state.events.subscribe();

    let connected = state.session.channel().is_connected().await;
    let joined = [
        ServerEvent::Notice(NoticeEvent::Connected { connected }),
        ServerEvent::Notice(NoticeEvent::ChatsLoaded(state.chats.chat_list())),
    ];
    for event in joined {
        if send_event(&mut socket, &event).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            received = events.recv() => {
                match received {
                    Ok(event) => {
                        if send_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        // Accepted: observers are lossy, the engine is not.
                        debug!(missed, "Observer lagged behind the event stream");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    // Commands arrive over HTTP; inbound frames are ignored.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!("Console observer disconnected");
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(text) => socket.send(Message::Text(text.into())).await,
        Err(e) => {
            debug!(error = %e, "Dropping unserializable event");
            Ok(())
        }
    }
}
