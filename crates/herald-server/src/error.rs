// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Server error type and HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use herald_core::channel::ChannelError;
use herald_core::error::CampaignError;

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors surfaced to console clients as `{code, message}` JSON bodies.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Campaign-level rejection (validation, busy session, dead channel).
    #[error(transparent)]
    Campaign(#[from] CampaignError),

    /// A direct channel operation failed (conversational sends).
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// An unknown chat was addressed.
    #[error("Chat '{0}' not found")]
    ChatNotFound(String),
}

impl ServerError {
    /// Wire error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Campaign(e) => e.error_code(),
            Self::Channel(ChannelError::NotConnected) => "CHANNEL_UNAVAILABLE",
            Self::Channel(_) => "CHANNEL_ERROR",
            Self::ChatNotFound(_) => "CHAT_NOT_FOUND",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Campaign(CampaignError::Validation { .. }) => StatusCode::BAD_REQUEST,
            Self::Campaign(CampaignError::CampaignAlreadyRunning) => StatusCode::CONFLICT,
            Self::Campaign(CampaignError::ChannelUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Campaign(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Channel(ChannelError::NotConnected) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Channel(_) => StatusCode::BAD_GATEWAY,
            Self::ChatNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = ServerError::Campaign(CampaignError::validation("sections", "not a list"));
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ServerError::Campaign(CampaignError::CampaignAlreadyRunning);
        assert_eq!(err.code(), "CAMPAIGN_ALREADY_RUNNING");
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = ServerError::Channel(ChannelError::NotConnected);
        assert_eq!(err.code(), "CHANNEL_UNAVAILABLE");
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err = ServerError::ChatNotFound("x@s.whatsapp.net".to_string());
        assert_eq!(err.code(), "CHAT_NOT_FOUND");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
