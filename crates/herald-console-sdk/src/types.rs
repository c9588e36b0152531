// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! High-level types for the console SDK.

use serde::{Deserialize, Serialize};

/// Display status of one recipient in the console table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecipientStatus {
    /// No events observed for this recipient yet.
    Pending,
    /// At least one event arrived, outcome still open.
    InProgress,
    /// Every message delivered, no errors.
    Sent,
    /// A mix of delivered and failed messages.
    Partial,
    /// Nothing delivered.
    Failed,
}

impl RecipientStatus {
    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecipientStatus::Sent | RecipientStatus::Partial | RecipientStatus::Failed
        )
    }

    /// Decide the terminal status from final counters.
    pub fn from_counters(success: u32, errors: u32) -> Self {
        if errors == 0 {
            RecipientStatus::Sent
        } else if success > 0 {
            RecipientStatus::Partial
        } else {
            RecipientStatus::Failed
        }
    }
}

/// One row of the console's per-recipient status table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientRow {
    /// Section the recipient belongs to.
    pub section_index: usize,
    /// Recipient slot within the section.
    pub number_index: usize,
    /// The recipient's number as the operator entered it.
    pub number: String,
    /// Messages planned for this recipient.
    pub total_messages: u32,
    /// Messages confirmed delivered.
    pub success: u32,
    /// Failures recorded (including attachment failures).
    pub errors: u32,
    /// Current display status.
    pub status: RecipientStatus,
}
