// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Console request handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use herald_core::error::CampaignError;
use herald_core::planner::{self, SectionInput};

use crate::chats::{Chat, ChatMessage};
use crate::error::{Result, ServerError};
use crate::gateway::GatewayNotice;
use crate::state::{AppState, NoticeEvent};

// ============================================================================
// Health & status
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Whether the server is up.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Server uptime in milliseconds.
    pub uptime_ms: u64,
}

/// Handle health check request.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: state.version.clone(),
        uptime_ms: state.uptime_ms() as u64,
    })
}

/// Snapshot late-joining observers resynchronize from.
///
/// The event stream is not replayed; a console that connects mid-campaign
/// learns the liveness state here and waits for the next completion event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Whether the messaging session is connected.
    pub connected: bool,
    /// Whether a campaign is in flight.
    pub campaign_running: bool,
    /// Number of known chats.
    pub chats: usize,
    /// Server version.
    pub version: String,
    /// Server uptime in milliseconds.
    pub uptime_ms: u64,
}

/// Handle status snapshot request.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        connected: state.session.channel().is_connected().await,
        campaign_running: state.session.is_busy(),
        chats: state.chats.chat_list().len(),
        version: state.version.clone(),
        uptime_ms: state.uptime_ms() as u64,
    })
}

// ============================================================================
// Campaigns
// ============================================================================

/// Request to start a campaign.
#[derive(Debug, Deserialize)]
pub struct StartCampaignRequest {
    /// The campaign's sections.
    pub sections: Vec<SectionInput>,
}

/// Accepted-campaign response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCampaignResponse {
    /// Server-assigned id for log correlation.
    pub campaign_id: Uuid,
    /// Planned task total.
    pub total: u32,
}

/// Handle a start-campaign command.
///
/// Validation happens synchronously - a malformed section never produces
/// events - and the accepted campaign drains in the background while
/// observers follow the event stream.
pub async fn start_campaign(
    State(state): State<AppState>,
    Json(request): Json<StartCampaignRequest>,
) -> Result<(StatusCode, Json<StartCampaignResponse>)> {
    if state.session.is_busy() {
        return Err(CampaignError::CampaignAlreadyRunning.into());
    }
    if !state.session.channel().is_connected().await {
        return Err(CampaignError::ChannelUnavailable.into());
    }

    let sections = planner::normalize(&request.sections).map_err(ServerError::Campaign)?;
    planner::validate(&sections).map_err(ServerError::Campaign)?;
    let plan = planner::plan(&sections, state.executor.resolver());

    let campaign_id = Uuid::new_v4();
    let total = plan.total;
    info!(
        %campaign_id,
        sections = request.sections.len(),
        total,
        "Campaign accepted"
    );

    let executor = state.executor.clone();
    tokio::spawn(async move {
        match executor.execute(plan).await {
            Ok(summary) => info!(
                %campaign_id,
                success = summary.success,
                errors = summary.errors,
                aborted = summary.aborted,
                "Campaign finished"
            ),
            // Lost a race with another start; the latch already reported it.
            Err(e) => error!(%campaign_id, error = %e, "Campaign failed to run"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(StartCampaignResponse { campaign_id, total }),
    ))
}

// ============================================================================
// Chats
// ============================================================================

/// Handle chat list request.
pub async fn list_chats(State(state): State<AppState>) -> Json<Vec<Chat>> {
    Json(state.chats.chat_list())
}

/// Handle chat history request.
pub async fn chat_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>> {
    state
        .chats
        .messages(&id)
        .map(Json)
        .ok_or(ServerError::ChatNotFound(id))
}

/// Request to send one conversational message.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Message body.
    pub message: String,
}

/// Handle a conversational send to one chat.
pub async fn send_chat_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ChatMessage>> {
    let address = state.executor.resolver().resolve(&id);
    state
        .session
        .channel()
        .send_text(&address, &request.message)
        .await?;

    let message = state.chats.record_outgoing(address.as_str(), &request.message);
    if state.chats.active().as_deref() == Some(address.as_str()) {
        state.notify(NoticeEvent::NewMessage(message.clone()));
    }
    if let Some(chat) = state.chats.chat(address.as_str()) {
        state.notify(NoticeEvent::ChatUpdated(chat));
    }

    Ok(Json(message))
}

/// Active-chat response: the selected conversation and its history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveChatResponse {
    /// The chat's channel address.
    pub chat_id: String,
    /// Display name of the chat.
    pub chat_name: String,
    /// Whether this is a group chat.
    pub is_group: bool,
    /// Message history in arrival order.
    pub messages: Vec<ChatMessage>,
}

/// Handle active-chat selection.
pub async fn activate_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActiveChatResponse>> {
    if !state.chats.contains(&id) {
        return Err(ServerError::ChatNotFound(id));
    }
    state.chats.set_active(&id);

    Ok(Json(ActiveChatResponse {
        chat_name: state.chats.display_name(&id),
        is_group: id.ends_with("@g.us"),
        messages: state.chats.messages(&id).unwrap_or_default(),
        chat_id: id,
    }))
}

// ============================================================================
// Gateway webhook
// ============================================================================

/// Handle a notification posted by the session gateway.
pub async fn gateway_events(
    State(state): State<AppState>,
    Json(notice): Json<GatewayNotice>,
) -> StatusCode {
    match notice {
        GatewayNotice::Status { connected } => {
            info!(connected, "Session connection state changed");
            state.connection.send_replace(connected);
            state.notify(NoticeEvent::Connected { connected });

            if !connected && state.session.is_busy() {
                warn!("Session dropped during a bulk send, campaign will abort");
                state.notify(NoticeEvent::Error {
                    message: "Connection lost during bulk send; the operation will stop."
                        .to_string(),
                });
            }
        }
        GatewayNotice::Message(inbound) => {
            let address = state.executor.resolver().resolve(&inbound.from);
            let message = state
                .chats
                .record_incoming(address.as_str(), &inbound.body, inbound.kind);

            if state.chats.active().as_deref() == Some(address.as_str()) {
                state.notify(NoticeEvent::NewMessage(message));
            }
            if let Some(chat) = state.chats.chat(address.as_str()) {
                state.notify(NoticeEvent::ChatUpdated(chat));
            }
        }
    }

    StatusCode::NO_CONTENT
}
