// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for herald-core.
//!
//! Provides the campaign-level error type surfaced to callers. Per-task send
//! failures are NOT errors at this level - the executor converts them into
//! counters and progress events at the task boundary.

use std::fmt;

/// Result type using CampaignError
pub type Result<T> = std::result::Result<T, CampaignError>;

/// Campaign errors surfaced to the caller before or instead of execution.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CampaignError {
    /// A section failed validation before planning.
    Validation {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// A campaign is already in flight on this session.
    CampaignAlreadyRunning,

    /// The outbound channel is disconnected; the campaign was not started.
    ChannelUnavailable,
}

impl CampaignError {
    /// Build a validation error for a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CampaignError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::CampaignAlreadyRunning => "CAMPAIGN_ALREADY_RUNNING",
            Self::ChannelUnavailable => "CHANNEL_UNAVAILABLE",
        }
    }
}

impl fmt::Display for CampaignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { field, message } => {
                write!(f, "Validation error for '{}': {}", field, message)
            }
            Self::CampaignAlreadyRunning => {
                write!(f, "A campaign is already running on this session")
            }
            Self::ChannelUnavailable => {
                write!(f, "Outbound channel is not connected")
            }
        }
    }
}

impl std::error::Error for CampaignError {}
