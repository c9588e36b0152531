// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory channel for testing.
//!
//! A scriptable channel implementation that simulates a messaging-network
//! session without any transport. Tests use it to drive the executor through
//! success, rejection, no-confirmation, unregistered-recipient, and
//! mid-campaign disconnect scenarios.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::traits::*;

/// A text send recorded by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    /// Destination address.
    pub address: String,
    /// Message body.
    pub text: String,
}

/// An image send recorded by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentImage {
    /// Destination address.
    pub address: String,
    /// MIME type of the payload.
    pub mime_type: String,
    /// Payload size in bytes.
    pub len: usize,
}

#[derive(Debug, Default)]
struct Script {
    /// Addresses whose text sends fail with a transport error.
    failing_addresses: HashSet<String>,
    /// Addresses whose text sends return a receipt without a message id.
    unconfirmed_addresses: HashSet<String>,
    /// Addresses whose image sends fail with a transport error.
    failing_image_addresses: HashSet<String>,
    /// Raw numbers confirmed absent from the network.
    unregistered_numbers: HashSet<String>,
    /// Drop the connection once this many text sends have been attempted.
    disconnect_after_sends: Option<u64>,
}

#[derive(Debug, Default)]
struct Recorded {
    texts: Vec<SentText>,
    images: Vec<SentImage>,
    registration_checks: Vec<String>,
}

/// In-memory channel for testing.
pub struct MemoryChannel {
    connected: AtomicBool,
    /// If false, `check_registered` reports the capability as unsupported.
    registration_supported: AtomicBool,
    /// If true, `check_registered` itself fails with a transport error.
    registration_check_fails: AtomicBool,
    message_seq: AtomicU64,
    text_attempts: AtomicU64,
    script: Mutex<Script>,
    recorded: Mutex<Recorded>,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChannel {
    /// Create a connected channel where every send succeeds.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            registration_supported: AtomicBool::new(true),
            registration_check_fails: AtomicBool::new(false),
            message_seq: AtomicU64::new(0),
            text_attempts: AtomicU64::new(0),
            script: Mutex::new(Script::default()),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Create a channel whose session is down from the start.
    pub fn disconnected() -> Self {
        let channel = Self::new();
        channel.connected.store(false, Ordering::SeqCst);
        channel
    }

    /// Flip the connection state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Make text sends to `address` fail with a transport error.
    pub async fn fail_sends_to(&self, address: &str) {
        let mut script = self.script.lock().await;
        script.failing_addresses.insert(address.to_string());
    }

    /// Make text sends to `address` return a receipt without a message id.
    pub async fn unconfirmed_sends_to(&self, address: &str) {
        let mut script = self.script.lock().await;
        script.unconfirmed_addresses.insert(address.to_string());
    }

    /// Make image sends to `address` fail with a transport error.
    pub async fn fail_images_to(&self, address: &str) {
        let mut script = self.script.lock().await;
        script.failing_image_addresses.insert(address.to_string());
    }

    /// Mark a raw number as confirmed-unregistered.
    pub async fn mark_unregistered(&self, raw_number: &str) {
        let mut script = self.script.lock().await;
        script.unregistered_numbers.insert(raw_number.to_string());
    }

    /// Drop the connection once `n` text sends have been attempted.
    pub async fn disconnect_after_sends(&self, n: u64) {
        let mut script = self.script.lock().await;
        script.disconnect_after_sends = Some(n);
    }

    /// Report the registration check capability as unsupported.
    pub fn without_registration_check(&self) {
        self.registration_supported.store(false, Ordering::SeqCst);
    }

    /// Make the registration check itself fail with a transport error.
    pub fn failing_registration_check(&self) {
        self.registration_check_fails.store(true, Ordering::SeqCst);
    }

    /// Every text send attempted so far, in order.
    pub async fn sent_texts(&self) -> Vec<SentText> {
        self.recorded.lock().await.texts.clone()
    }

    /// Every image send attempted so far, in order.
    pub async fn sent_images(&self) -> Vec<SentImage> {
        self.recorded.lock().await.images.clone()
    }

    /// Every raw number whose registration was checked, in order.
    pub async fn registration_checks(&self) -> Vec<String> {
        self.recorded.lock().await.registration_checks.clone()
    }

    fn next_receipt(&self) -> SendReceipt {
        let seq = self.message_seq.fetch_add(1, Ordering::SeqCst) + 1;
        SendReceipt {
            message_id: Some(format!("mem-{seq}")),
            status: Some(1),
        }
    }
}

#[async_trait]
impl OutboundChannel for MemoryChannel {
    fn channel_type(&self) -> &'static str {
        "memory"
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_text(&self, address: &ChannelAddress, text: &str) -> Result<SendReceipt> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ChannelError::NotConnected);
        }

        let attempts = self.text_attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let script = self.script.lock().await;
        let fails = script.failing_addresses.contains(address.as_str());
        let unconfirmed = script.unconfirmed_addresses.contains(address.as_str());
        let drop_after = script
            .disconnect_after_sends
            .is_some_and(|limit| attempts >= limit);
        drop(script);

        {
            let mut recorded = self.recorded.lock().await;
            recorded.texts.push(SentText {
                address: address.as_str().to_string(),
                text: text.to_string(),
            });
        }

        let result = if fails {
            Err(ChannelError::Transport("scripted failure".to_string()))
        } else if unconfirmed {
            Ok(SendReceipt::default())
        } else {
            Ok(self.next_receipt())
        };

        // The session drops after the Nth send has gone out.
        if drop_after {
            self.connected.store(false, Ordering::SeqCst);
        }

        result
    }

    async fn send_image(
        &self,
        address: &ChannelAddress,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<SendReceipt> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ChannelError::NotConnected);
        }

        let fails = {
            let script = self.script.lock().await;
            script.failing_image_addresses.contains(address.as_str())
        };

        {
            let mut recorded = self.recorded.lock().await;
            recorded.images.push(SentImage {
                address: address.as_str().to_string(),
                mime_type: mime_type.to_string(),
                len: bytes.len(),
            });
        }

        if fails {
            return Err(ChannelError::Transport("scripted image failure".to_string()));
        }
        Ok(self.next_receipt())
    }

    async fn check_registered(&self, raw_number: &str) -> Result<Option<bool>> {
        {
            let mut recorded = self.recorded.lock().await;
            recorded.registration_checks.push(raw_number.to_string());
        }

        if !self.registration_supported.load(Ordering::SeqCst) {
            return Ok(None);
        }
        if self.registration_check_fails.load(Ordering::SeqCst) {
            return Err(ChannelError::Transport(
                "scripted registration failure".to_string(),
            ));
        }

        let script = self.script.lock().await;
        Ok(Some(!script.unregistered_numbers.contains(raw_number)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(raw: &str) -> ChannelAddress {
        ChannelAddress::new(format!("{raw}@s.whatsapp.net"))
    }

    #[tokio::test]
    async fn test_send_text_success() {
        let channel = MemoryChannel::new();

        let receipt = channel.send_text(&addr("15550000001"), "hi").await.unwrap();

        assert!(receipt.confirmed());
        assert_eq!(channel.sent_texts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_send_text_when_disconnected() {
        let channel = MemoryChannel::disconnected();

        let result = channel.send_text(&addr("15550000001"), "hi").await;

        assert!(matches!(result, Err(ChannelError::NotConnected)));
        assert!(channel.sent_texts().await.is_empty());
    }

    #[tokio::test]
    async fn test_scripted_transport_failure() {
        let channel = MemoryChannel::new();
        channel.fail_sends_to(addr("15550000001").as_str()).await;

        let result = channel.send_text(&addr("15550000001"), "hi").await;
        assert!(matches!(result, Err(ChannelError::Transport(_))));

        // Other recipients are unaffected.
        let receipt = channel
            .send_text(&addr("15550000002"), "hi")
            .await
            .unwrap();
        assert!(receipt.confirmed());
    }

    #[tokio::test]
    async fn test_unconfirmed_send_has_no_message_id() {
        let channel = MemoryChannel::new();
        channel
            .unconfirmed_sends_to(addr("15550000001").as_str())
            .await;

        let receipt = channel.send_text(&addr("15550000001"), "hi").await.unwrap();

        assert!(!receipt.confirmed());
    }

    #[tokio::test]
    async fn test_disconnect_after_sends() {
        let channel = MemoryChannel::new();
        channel.disconnect_after_sends(2).await;

        assert!(channel.send_text(&addr("1"), "a").await.is_ok());
        assert!(channel.send_text(&addr("2"), "b").await.is_ok());
        assert!(!channel.is_connected().await);
        assert!(matches!(
            channel.send_text(&addr("3"), "c").await,
            Err(ChannelError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_registration_check_variants() {
        let channel = MemoryChannel::new();
        channel.mark_unregistered("15550000009").await;

        assert_eq!(
            channel.check_registered("15550000001").await.unwrap(),
            Some(true)
        );
        assert_eq!(
            channel.check_registered("15550000009").await.unwrap(),
            Some(false)
        );

        channel.without_registration_check();
        assert_eq!(channel.check_registered("15550000001").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_image_failure_script() {
        let channel = MemoryChannel::new();
        channel.fail_images_to(addr("15550000001").as_str()).await;

        let result = channel
            .send_image(&addr("15550000001"), b"bytes", "image/png")
            .await;

        assert!(matches!(result, Err(ChannelError::Transport(_))));
        assert_eq!(channel.sent_images().await.len(), 1);
    }
}
