// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end tests for the campaign drain loop.

use std::sync::Arc;
use std::time::Duration;

use herald_core::channel::MemoryChannel;
use herald_core::config::EngineConfig;
use herald_core::error::CampaignError;
use herald_core::events::{CampaignEvent, DebugKind, RecordingSink};
use herald_core::executor::CampaignExecutor;
use herald_core::planner::{self, SectionInput};
use herald_core::session::SessionContext;

fn quick_config() -> EngineConfig {
    EngineConfig {
        pacing_delay: Duration::ZERO,
        ..EngineConfig::default()
    }
}

fn section(numbers: &[&str], messages: &[&str]) -> SectionInput {
    SectionInput {
        numbers: Some(numbers.iter().map(|s| s.to_string()).collect()),
        messages: Some(messages.iter().map(|s| s.to_string()).collect()),
        ..SectionInput::default()
    }
}

fn section_with_image(numbers: &[&str], messages: &[&str]) -> SectionInput {
    SectionInput {
        image: Some(planner::ImageInput {
            mime_type: Some("image/png".to_string()),
            bytes: "aGVyYWxk".to_string(),
        }),
        image_name: Some("promo.png".to_string()),
        ..section(numbers, messages)
    }
}

struct Harness {
    channel: Arc<MemoryChannel>,
    sink: Arc<RecordingSink>,
    executor: CampaignExecutor,
}

fn harness(channel: MemoryChannel) -> Harness {
    harness_with_config(channel, quick_config())
}

fn harness_with_config(channel: MemoryChannel, config: EngineConfig) -> Harness {
    let channel = Arc::new(channel);
    let sink = Arc::new(RecordingSink::new());
    let session = Arc::new(SessionContext::new(
        channel.clone(),
        sink.clone(),
        config,
    ));
    Harness {
        channel,
        sink,
        executor: CampaignExecutor::new(session),
    }
}

fn plan_sections(executor: &CampaignExecutor, inputs: &[SectionInput]) -> planner::CampaignPlan {
    let sections = planner::normalize(inputs).expect("sections normalize");
    planner::validate(&sections).expect("sections validate");
    planner::plan(&sections, executor.resolver())
}

fn progress_events(events: &[CampaignEvent]) -> Vec<&herald_core::events::ProgressUpdate> {
    events
        .iter()
        .filter_map(|e| match e {
            CampaignEvent::Progress(p) => Some(p),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_clean_campaign_delivers_every_task() {
    let h = harness(MemoryChannel::new());
    let plan = plan_sections(
        &h.executor,
        &[section(&["15550000001", "15550000002"], &["hi", "bye"])],
    );

    let summary = h.executor.execute(plan).await.unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.success, 4);
    assert_eq!(summary.errors, 0);
    assert!(!summary.aborted);
    assert_eq!(summary.success + summary.errors, summary.total);

    // Sends follow the planned (recipient, message) nesting.
    let texts = h.channel.sent_texts().await;
    let order: Vec<(&str, &str)> = texts
        .iter()
        .map(|t| (t.address.as_str(), t.text.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("15550000001@s.whatsapp.net", "hi"),
            ("15550000001@s.whatsapp.net", "bye"),
            ("15550000002@s.whatsapp.net", "hi"),
            ("15550000002@s.whatsapp.net", "bye"),
        ]
    );
}

#[tokio::test]
async fn test_progress_events_are_ordered_and_cumulative() {
    let h = harness(MemoryChannel::new());
    let plan = plan_sections(
        &h.executor,
        &[section(&["15550000001", "15550000002"], &["hi", "bye"])],
    );

    h.executor.execute(plan).await.unwrap();
    let events = h.sink.snapshot();

    assert_eq!(events.first().map(|e| e.event_name()), Some("sections_start"));
    assert_eq!(events.last().map(|e| e.event_name()), Some("sections_complete"));

    let progress = progress_events(&events);
    assert_eq!(progress.len(), 4);
    let cursors: Vec<u32> = progress.iter().map(|p| p.current).collect();
    assert_eq!(cursors, vec![1, 2, 3, 4]);

    // Recipient r1 finishes both messages before r2 starts.
    assert_eq!(progress[0].number, "15550000001");
    assert_eq!(progress[0].section_current, 1);
    assert_eq!(progress[1].number, "15550000001");
    assert_eq!(progress[1].section_current, 2);
    assert_eq!(progress[2].number, "15550000002");
    assert_eq!(progress[2].per_number_success, Some(1));

    // Per-recipient totals visible to consoles.
    assert_eq!(progress[3].section_total, 2);
    assert_eq!(progress[3].per_number_success, Some(2));
    assert_eq!(progress[3].per_number_errors, Some(0));
}

#[tokio::test]
async fn test_unregistered_recipient_fails_without_send_attempts() {
    let channel = MemoryChannel::new();
    channel.mark_unregistered("15550000009").await;
    let h = harness(channel);

    let plan = plan_sections(
        &h.executor,
        &[section(&["15550000009", "15550000001"], &["hi", "bye"])],
    );

    let summary = h.executor.execute(plan).await.unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.success, 2);
    assert_eq!(summary.errors, 2);
    assert_eq!(summary.success + summary.errors, summary.total);

    // No send was attempted for the unregistered recipient.
    let texts = h.channel.sent_texts().await;
    assert!(texts.iter().all(|t| !t.address.starts_with("15550000009")));

    // Every planned message of the recipient shows up as a failed task.
    let events = h.sink.snapshot();
    let progress = progress_events(&events);
    let doomed: Vec<_> = progress.iter().filter(|p| p.number == "15550000009").collect();
    assert_eq!(doomed.len(), 2);
    assert_eq!(doomed[1].per_number_errors, Some(2));
    assert_eq!(doomed[1].per_number_success, Some(0));
}

#[tokio::test]
async fn test_registration_checked_once_per_recipient() {
    let h = harness(MemoryChannel::new());
    let plan = plan_sections(
        &h.executor,
        &[section(&["15550000001", "15550000002"], &["a", "b", "c"])],
    );

    h.executor.execute(plan).await.unwrap();

    let checks = h.channel.registration_checks().await;
    assert_eq!(checks, vec!["15550000001", "15550000002"]);
}

#[tokio::test]
async fn test_failed_registration_check_does_not_block() {
    let channel = MemoryChannel::new();
    channel.failing_registration_check();
    let h = harness(channel);

    let plan = plan_sections(&h.executor, &[section(&["15550000001"], &["hi"])]);
    let summary = h.executor.execute(plan).await.unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(summary.errors, 0);
}

#[tokio::test]
async fn test_transient_failure_continues_campaign() {
    let channel = MemoryChannel::new();
    channel.fail_sends_to("15550000001@s.whatsapp.net").await;
    let h = harness(channel);

    let plan = plan_sections(
        &h.executor,
        &[section(&["15550000001", "15550000002"], &["hi"])],
    );
    let summary = h.executor.execute(plan).await.unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(summary.errors, 1);
    assert!(!summary.aborted);

    // Both recipients were attempted despite the first one failing.
    assert_eq!(h.channel.sent_texts().await.len(), 2);
}

#[tokio::test]
async fn test_receipt_without_message_id_counts_as_failure() {
    let channel = MemoryChannel::new();
    channel
        .unconfirmed_sends_to("15550000001@s.whatsapp.net")
        .await;
    let h = harness(channel);

    let plan = plan_sections(&h.executor, &[section(&["15550000001"], &["hi"])]);
    let summary = h.executor.execute(plan).await.unwrap();

    assert_eq!(summary.success, 0);
    assert_eq!(summary.errors, 1);

    let events = h.sink.snapshot();
    assert!(events.iter().any(|e| matches!(
        e,
        CampaignEvent::Debug(d) if d.kind == DebugKind::MessageNoConfirm
    )));
}

#[tokio::test]
async fn test_liveness_probe_aborts_after_disconnect() {
    let channel = MemoryChannel::new();
    channel.disconnect_after_sends(5).await;
    let h = harness(channel);

    let numbers: Vec<String> = (0..12).map(|i| format!("1555000{i:04}")).collect();
    let refs: Vec<&str> = numbers.iter().map(String::as_str).collect();
    let plan = plan_sections(&h.executor, &[section(&refs, &["hi"])]);

    let summary = h.executor.execute(plan).await.unwrap();

    // Five tasks went through; the probe at the next boundary caught the
    // drop and no further sends were attempted.
    assert!(summary.aborted);
    assert_eq!(summary.success, 5);
    assert_eq!(summary.errors, 0);
    assert_eq!(h.channel.sent_texts().await.len(), 5);

    let events = h.sink.snapshot();
    let progress = progress_events(&events);
    assert_eq!(progress.last().unwrap().current, 5);

    // Nothing is emitted after the aborted completion.
    let complete_pos = events
        .iter()
        .position(|e| e.event_name() == "sections_complete")
        .unwrap();
    assert_eq!(complete_pos, events.len() - 1);
}

#[tokio::test]
async fn test_not_connected_send_aborts_between_probes() {
    let channel = MemoryChannel::new();
    channel.disconnect_after_sends(2).await;
    let h = harness(channel);

    let numbers: Vec<String> = (0..8).map(|i| format!("1555000{i:04}")).collect();
    let refs: Vec<&str> = numbers.iter().map(String::as_str).collect();
    let plan = plan_sections(&h.executor, &[section(&refs, &["hi"])]);

    let summary = h.executor.execute(plan).await.unwrap();

    // Task 3 hit a dead channel before the next probe boundary; the failed
    // task is counted and the rest of the plan is dropped.
    assert!(summary.aborted);
    assert_eq!(summary.success, 2);
    assert_eq!(summary.errors, 1);

    let events = h.sink.snapshot();
    assert_eq!(events.last().map(|e| e.event_name()), Some("sections_complete"));
    assert_eq!(progress_events(&events).len(), 2);
}

#[tokio::test]
async fn test_image_sent_once_per_recipient_before_first_message() {
    let h = harness(MemoryChannel::new());
    let plan = plan_sections(
        &h.executor,
        &[
            section_with_image(&["15550000001", "15550000002"], &["hi", "bye"]),
            section(&["15550000003"], &["yo"]),
        ],
    );

    let summary = h.executor.execute(plan).await.unwrap();
    assert_eq!(summary.success, 5);
    assert_eq!(summary.errors, 0);

    // Exactly one image per recipient of the image-carrying section.
    let images = h.channel.sent_images().await;
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].address, "15550000001@s.whatsapp.net");
    assert_eq!(images[1].address, "15550000002@s.whatsapp.net");
    assert!(images.iter().all(|i| i.mime_type == "image/png"));

    // Debug stream shows the image going out before the recipient's first text.
    let events = h.sink.snapshot();
    let kinds: Vec<DebugKind> = events
        .iter()
        .filter_map(|e| match e {
            CampaignEvent::Debug(d) if d.number == "15550000001" => Some(d.kind),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            DebugKind::SendingImage,
            DebugKind::ImageSent,
            DebugKind::MessageSent,
            DebugKind::MessageSent,
        ]
    );
}

#[tokio::test]
async fn test_image_failure_does_not_block_text() {
    let channel = MemoryChannel::new();
    channel.fail_images_to("15550000001@s.whatsapp.net").await;
    let h = harness(channel);

    let plan = plan_sections(&h.executor, &[section_with_image(&["15550000001"], &["hi"])]);
    let summary = h.executor.execute(plan).await.unwrap();

    // The text still went out; the attachment failure is an extra error on
    // top of the planned task count.
    assert_eq!(summary.total, 1);
    assert_eq!(summary.success, 1);
    assert_eq!(summary.errors, 1);
    assert_eq!(h.channel.sent_texts().await.len(), 1);

    let events = h.sink.snapshot();
    assert!(events.iter().any(|e| matches!(
        e,
        CampaignEvent::Debug(d) if d.kind == DebugKind::ImageFailed
    )));

    let progress = progress_events(&events);
    // Attachment failure snapshots progress without advancing the cursor.
    assert_eq!(progress[0].current, 0);
    assert_eq!(progress[0].per_number_errors, Some(1));
    assert_eq!(progress.last().unwrap().current, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_campaign_rejected_while_running() {
    let config = EngineConfig {
        pacing_delay: Duration::from_millis(100),
        ..EngineConfig::default()
    };
    let channel = Arc::new(MemoryChannel::new());
    let sink = Arc::new(RecordingSink::new());
    let session = Arc::new(SessionContext::new(channel, sink, config));
    let executor = Arc::new(CampaignExecutor::new(session));

    let plan = plan_sections(
        &executor,
        &[section(&["15550000001", "15550000002"], &["hi"])],
    );
    let second_plan = plan_sections(&executor, &[section(&["15550000003"], &["hi"])]);

    let first = {
        let executor = executor.clone();
        tokio::spawn(async move { executor.execute(plan).await })
    };

    // Give the first campaign time to claim the latch.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let result = executor.execute(second_plan).await;
    assert!(matches!(result, Err(CampaignError::CampaignAlreadyRunning)));

    let summary = first.await.unwrap().unwrap();
    assert_eq!(summary.success, 2);

    // The latch is free again once the first campaign finished.
    let third = plan_sections(&executor, &[section(&["15550000004"], &["hi"])]);
    assert!(executor.execute(third).await.is_ok());
}
