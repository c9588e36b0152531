// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed campaign events and the observer sink.
//!
//! The executor reports progress through an append-only stream of
//! [`CampaignEvent`]s. The stream is observational: the executor's own state
//! is authoritative, observers may join late or drop events, and no
//! acknowledgment flows back. Field names follow the console wire contract
//! (camelCase, `event`/`data` envelope).

use serde::{Deserialize, Serialize};

/// One campaign event, serialized as `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum CampaignEvent {
    /// Campaign accepted and started; carries the planned task total.
    #[serde(rename = "sections_start")]
    Started(CampaignStarted),

    /// One task finished (delivered, failed, or synthetically failed).
    #[serde(rename = "sections_progress")]
    Progress(ProgressUpdate),

    /// Diagnostic detail observers may ignore.
    #[serde(rename = "sections_debug")]
    Debug(DebugUpdate),

    /// Campaign drained or aborted; carries final counters.
    #[serde(rename = "sections_complete")]
    Complete(CampaignSummary),
}

impl CampaignEvent {
    /// The wire name of this event.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Started(_) => "sections_start",
            Self::Progress(_) => "sections_progress",
            Self::Debug(_) => "sections_debug",
            Self::Complete(_) => "sections_complete",
        }
    }
}

/// Payload of `sections_start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignStarted {
    /// Planned number of text sends across all sections.
    pub total: u32,
}

/// Payload of `sections_progress`.
///
/// Carries both the global counters and a per-recipient snapshot. The
/// per-recipient fields are optional on the wire so that aggregators keep
/// working against senders that omit them (they fall back to global deltas).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Tasks completed so far (the cursor).
    pub current: u32,
    /// Planned task total.
    pub total: u32,
    /// Tasks confirmed delivered so far.
    pub success: u32,
    /// Tasks failed so far (including synthetic and attachment failures).
    pub errors: u32,
    /// Section the task belongs to.
    pub section_index: usize,
    /// Recipient slot within the section.
    pub number_index: usize,
    /// The recipient's raw number as the caller supplied it.
    pub number: String,
    /// Successes recorded against this recipient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_number_success: Option<u32>,
    /// Errors recorded against this recipient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_number_errors: Option<u32>,
    /// Messages planned per recipient in this section.
    pub section_total: u32,
    /// 1-based index of the message within the recipient's list.
    pub section_current: u32,
}

/// Discriminator for `sections_debug` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugKind {
    /// An image upload is about to start for a recipient.
    SendingImage,
    /// The image went out and the channel confirmed it.
    ImageSent,
    /// The image send failed; the recipient's text messages still follow.
    ImageFailed,
    /// A text message went out with a confirmed message id.
    MessageSent,
    /// The channel returned no message id; counted as a failure.
    MessageNoConfirm,
    /// The send call failed with a non-fatal transport error.
    SendFailed,
}

/// Payload of `sections_debug`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugUpdate {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: DebugKind,
    /// Section the task belongs to.
    pub section_index: usize,
    /// Recipient slot within the section.
    pub number_index: usize,
    /// The recipient's raw number.
    pub number: String,
    /// Message position for text-send diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_index: Option<usize>,
    /// Message id the channel assigned, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Image payload size for attachment diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    /// Image MIME type for attachment diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Human-readable failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DebugUpdate {
    /// A minimal debug payload for a task position.
    pub fn new(kind: DebugKind, section_index: usize, number_index: usize, number: &str) -> Self {
        Self {
            kind,
            section_index,
            number_index,
            number: number.to_string(),
            message_index: None,
            message_id: None,
            bytes: None,
            mime_type: None,
            detail: None,
        }
    }
}

/// Payload of `sections_complete`, also the executor's return value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    /// Tasks confirmed delivered.
    pub success: u32,
    /// Tasks failed.
    pub errors: u32,
    /// Planned task total.
    pub total: u32,
    /// Set when the campaign stopped before draining the plan.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub aborted: bool,
}

/// Observer sink for campaign events.
///
/// Emission is fire-and-forget and must never block the drain loop; sinks
/// that fan out to slow consumers buffer or drop on their side.
pub trait EventSink: Send + Sync {
    /// Deliver one event to all observers.
    fn emit(&self, event: CampaignEvent);
}

/// Sink that discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: CampaignEvent) {}
}

/// Sink that records events for inspection in tests.
#[derive(Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<CampaignEvent>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event emitted so far, in order.
    pub fn snapshot(&self) -> Vec<CampaignEvent> {
        self.events.lock().expect("sink poisoned").clone()
    }

    /// Drain and return the recorded events.
    pub fn take(&self) -> Vec<CampaignEvent> {
        std::mem::take(&mut *self.events.lock().expect("sink poisoned"))
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: CampaignEvent) {
        self.events.lock().expect("sink poisoned").push(event);
    }
}
