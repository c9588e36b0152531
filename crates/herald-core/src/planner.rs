// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Campaign planning.
//!
//! Turns caller-supplied sections into a flat, ordered list of send tasks.
//! Planning is pure: the same input always yields the same plan, and no state
//! is retained between calls. Validation of caller-facing preconditions
//! (non-empty sections, number format) happens before planning, not inside it.

use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{CampaignError, Result};
use crate::resolver::RecipientResolver;
use crate::state::RecipientKey;

/// MIME type assumed when an image payload does not declare one.
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// One section as received from the console.
///
/// Both the list fields and their legacy scalar counterparts are accepted:
/// `numbers` may instead arrive as a single delimiter-separated `number`
/// string, `messages` as a single `message`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionInput {
    /// Recipient numbers, one per entry.
    pub numbers: Option<Vec<String>>,
    /// Legacy: recipient numbers separated by comma, space, or newline.
    pub number: Option<String>,
    /// Ordered message bodies sent to every recipient of the section.
    pub messages: Option<Vec<String>>,
    /// Legacy: a single message body.
    pub message: Option<String>,
    /// Optional image attached once per recipient.
    pub image: Option<ImageInput>,
    /// Display name of the image, echoed back to consoles.
    pub image_name: Option<String>,
}

/// Image payload as received from the console.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    /// MIME type; defaults to `image/jpeg` when absent.
    pub mime_type: Option<String>,
    /// Base64 payload; `data:` URLs are accepted and carry their own MIME type.
    pub bytes: String,
}

/// A decoded image shared by every task of its section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// MIME type handed to the channel.
    pub mime_type: String,
}

/// A section after normalization: trimmed, non-empty entries, decoded image.
#[derive(Debug, Clone)]
pub struct NormalizedSection {
    /// Recipient numbers, trimmed, empties dropped.
    pub numbers: Vec<String>,
    /// Ordered message bodies.
    pub messages: Vec<String>,
    /// Decoded image, shared across the section's recipients.
    pub image: Option<Arc<ImageAttachment>>,
    /// Display name of the image.
    pub image_name: Option<String>,
}

/// The atomic unit of work: one (recipient, message) pair.
#[derive(Debug, Clone)]
pub struct SendTask {
    /// Section the task came from.
    pub section_index: usize,
    /// Recipient slot within the section.
    pub number_index: usize,
    /// The recipient's normalized channel address.
    pub address: crate::channel::ChannelAddress,
    /// The recipient's number as the caller supplied it.
    pub raw_number: String,
    /// Position of the message within the section's list.
    pub message_index: usize,
    /// Message body.
    pub text: String,
    /// True for the recipient's first message; the image attaches here.
    pub is_first_message_of_recipient: bool,
    /// Messages planned per recipient in this section.
    pub section_total: u32,
    /// The section's image, if any.
    pub image: Option<Arc<ImageAttachment>>,
}

impl SendTask {
    /// The (section, recipient-slot) key counters are grouped under.
    pub fn recipient_key(&self) -> RecipientKey {
        (self.section_index, self.number_index)
    }
}

/// A planned campaign: ordered tasks plus the precomputed total.
#[derive(Debug, Clone, Default)]
pub struct CampaignPlan {
    /// Tasks in section, then recipient, then message order.
    pub tasks: Vec<SendTask>,
    /// `Σ len(numbers) × len(messages)` over all sections.
    pub total: u32,
}

/// Normalize a batch of input sections.
///
/// Fails only on an undecodable image payload; empty sections survive
/// normalization and are caught by [`validate`].
pub fn normalize(inputs: &[SectionInput]) -> Result<Vec<NormalizedSection>> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| normalize_section(index, input))
        .collect()
}

fn normalize_section(index: usize, input: &SectionInput) -> Result<NormalizedSection> {
    let numbers = match (&input.numbers, &input.number) {
        (Some(list), _) => list
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect(),
        (None, Some(joined)) => joined
            .split([' ', ',', '\n', '\r'])
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect(),
        (None, None) => Vec::new(),
    };

    let messages = match (&input.messages, &input.message) {
        (Some(list), _) => list.clone(),
        (None, Some(single)) => vec![single.clone()],
        (None, None) => Vec::new(),
    };

    let image = match &input.image {
        Some(raw) => Some(Arc::new(decode_image(index, raw)?)),
        None => None,
    };

    Ok(NormalizedSection {
        numbers,
        messages,
        image,
        image_name: input.image_name.clone(),
    })
}

/// Decode a base64 (or `data:` URL) image payload.
fn decode_image(section_index: usize, input: &ImageInput) -> Result<ImageAttachment> {
    let field = format!("sections[{section_index}].image");

    let (mime_type, payload) = match input.bytes.strip_prefix("data:") {
        Some(rest) => match rest.split_once(";base64,") {
            Some((mime, payload)) => (mime.to_string(), payload),
            None => {
                return Err(CampaignError::validation(
                    field,
                    "data URL must carry a base64 payload",
                ));
            }
        },
        None => (
            input
                .mime_type
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string()),
            input.bytes.as_str(),
        ),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| CampaignError::validation(field, "invalid base64 image payload"))?;

    Ok(ImageAttachment { bytes, mime_type })
}

/// Enforce the caller-facing preconditions on normalized sections.
///
/// Every section must resolve to at least one number and one message, and
/// every bare number must be 10-15 digits once non-digits are stripped.
/// Identifiers that already carry an address delimiter are passed through.
pub fn validate(sections: &[NormalizedSection]) -> Result<()> {
    for (index, section) in sections.iter().enumerate() {
        if section.numbers.is_empty() {
            return Err(CampaignError::validation(
                format!("sections[{index}].numbers"),
                "at least one recipient number is required",
            ));
        }
        if section.messages.is_empty() {
            return Err(CampaignError::validation(
                format!("sections[{index}].messages"),
                "at least one message is required",
            ));
        }
        for (slot, number) in section.numbers.iter().enumerate() {
            if number.contains('@') {
                continue;
            }
            let digits = number.chars().filter(char::is_ascii_digit).count();
            if !(10..=15).contains(&digits) {
                return Err(CampaignError::validation(
                    format!("sections[{index}].numbers[{slot}]"),
                    "must contain 10-15 digits",
                ));
            }
        }
    }
    Ok(())
}

/// Flatten sections into an ordered task list.
///
/// Order is stable: sections in input order, recipients within a section,
/// then that recipient's messages. The recipient is the grouping key for the
/// section image, which attaches to the first message. Sections with zero
/// numbers or zero messages contribute no tasks and are otherwise silent.
pub fn plan(sections: &[NormalizedSection], resolver: &RecipientResolver) -> CampaignPlan {
    let mut tasks = Vec::new();

    for (section_index, section) in sections.iter().enumerate() {
        let section_total = section.messages.len() as u32;
        for (number_index, raw_number) in section.numbers.iter().enumerate() {
            let address = resolver.resolve(raw_number);
            for (message_index, text) in section.messages.iter().enumerate() {
                tasks.push(SendTask {
                    section_index,
                    number_index,
                    address: address.clone(),
                    raw_number: raw_number.clone(),
                    message_index,
                    text: text.clone(),
                    is_first_message_of_recipient: message_index == 0,
                    section_total,
                    image: section.image.clone(),
                });
            }
        }
    }

    let total = tasks.len() as u32;
    CampaignPlan { tasks, total }
}
