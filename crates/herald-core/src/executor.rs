// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The campaign executor.
//!
//! Drives a planned task list to completion against the outbound channel,
//! one task at a time, serialized. The drain loop is the only writer of
//! campaign state; observers consume the emitted event stream and never
//! touch shared state. The only suspension points are the registration
//! pre-check, each send call, and the pacing delay, so progress events are
//! emitted in exactly the order tasks were planned.
//!
//! A campaign survives individual send failures and keeps going; only a
//! confirmed loss of the session aborts the remaining plan. A mid-campaign
//! disconnect must not spin through hundreds of doomed send attempts, which
//! is why connectivity is probed between tasks and a not-connected send
//! short-circuits immediately.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{CampaignError, Result};
use crate::events::{
    CampaignEvent, CampaignStarted, CampaignSummary, DebugKind, DebugUpdate, ProgressUpdate,
};
use crate::planner::{CampaignPlan, SendTask};
use crate::resolver::{RecipientResolver, Registration};
use crate::session::SessionContext;
use crate::state::{CampaignState, RecipientKey};

/// Executes planned campaigns against the session's outbound channel.
pub struct CampaignExecutor {
    session: Arc<SessionContext>,
    resolver: RecipientResolver,
}

impl CampaignExecutor {
    /// Create an executor bound to a session.
    pub fn new(session: Arc<SessionContext>) -> Self {
        let resolver = RecipientResolver::new(
            session.config().address_domain.clone(),
            session.channel().clone(),
        );
        Self { session, resolver }
    }

    /// The resolver this executor plans and pre-checks with.
    pub fn resolver(&self) -> &RecipientResolver {
        &self.resolver
    }

    /// Drive a planned campaign to completion or abort.
    ///
    /// Non-reentrant: a second call while a campaign is in flight fails with
    /// [`CampaignError::CampaignAlreadyRunning`]. A disconnected channel at
    /// start fails with [`CampaignError::ChannelUnavailable`]. Everything
    /// else - transient send failures, unregistered recipients, attachment
    /// failures, even a mid-campaign disconnect - is absorbed into the
    /// returned [`CampaignSummary`] and the event stream.
    pub async fn execute(&self, plan: CampaignPlan) -> Result<CampaignSummary> {
        let _guard = self.session.try_acquire()?;

        let channel = self.session.channel();
        let sink = self.session.sink();
        let config = self.session.config();

        if !channel.is_connected().await {
            return Err(CampaignError::ChannelUnavailable);
        }

        info!(
            total = plan.total,
            tasks = plan.tasks.len(),
            pacing_ms = config.pacing_delay.as_millis() as u64,
            "Campaign started"
        );
        sink.emit(CampaignEvent::Started(CampaignStarted { total: plan.total }));

        let mut state = CampaignState::new(plan.total);
        let mut skip_recipient: Option<RecipientKey> = None;

        for task in &plan.tasks {
            // Probe connectivity every few tasks rather than every task; a
            // lost session aborts the rest of the plan.
            if config.liveness_probe_every > 0
                && state.cursor() > 0
                && state.cursor() % config.liveness_probe_every == 0
                && !channel.is_connected().await
            {
                warn!(
                    cursor = state.cursor(),
                    total = state.total(),
                    "Connection lost mid-campaign, aborting remaining plan"
                );
                return Ok(self.finish_aborted(&mut state));
            }

            let key = task.recipient_key();

            // Registration pre-check, once per recipient. A confirmed
            // negative fails all of the recipient's messages without a send.
            if task.is_first_message_of_recipient {
                skip_recipient = None;
                if self.resolver.check_registered(&task.raw_number).await
                    == Registration::Unregistered
                {
                    warn!(
                        number = %task.raw_number,
                        section = task.section_index,
                        "Recipient not registered on the network, failing its messages"
                    );
                    skip_recipient = Some(key);
                }
            }

            if skip_recipient == Some(key) {
                state.record_task_error(key);
                state.advance_cursor();
                sink.emit(progress_event(task, &state));
                continue;
            }

            // Section image goes out once per recipient, before the first
            // text message. Its outcome is independent of the text send.
            if task.is_first_message_of_recipient
                && let Some(image) = &task.image
            {
                self.send_section_image(task, image, &mut state).await;
            }

            match channel.send_text(&task.address, &task.text).await {
                Ok(receipt) if receipt.confirmed() => {
                    state.record_task_success(key);
                    debug!(
                        number = %task.raw_number,
                        message_id = receipt.message_id.as_deref().unwrap_or_default(),
                        "Message confirmed"
                    );
                    let mut update =
                        DebugUpdate::new(DebugKind::MessageSent, task.section_index, task.number_index, &task.raw_number);
                    update.message_index = Some(task.message_index);
                    update.message_id = receipt.message_id;
                    sink.emit(CampaignEvent::Debug(update));
                }
                Ok(_) => {
                    // No message id means the channel never confirmed the
                    // send; count it as a failure.
                    state.record_task_error(key);
                    warn!(number = %task.raw_number, "Message sent without confirmation");
                    let mut update =
                        DebugUpdate::new(DebugKind::MessageNoConfirm, task.section_index, task.number_index, &task.raw_number);
                    update.message_index = Some(task.message_index);
                    sink.emit(CampaignEvent::Debug(update));
                }
                Err(e) if e.is_disconnect() => {
                    state.record_task_error(key);
                    warn!(
                        number = %task.raw_number,
                        cursor = state.cursor(),
                        "Channel disconnected during send, aborting remaining plan"
                    );
                    return Ok(self.finish_aborted(&mut state));
                }
                Err(e) => {
                    state.record_task_error(key);
                    warn!(number = %task.raw_number, error = %e, "Send failed");
                    let mut update =
                        DebugUpdate::new(DebugKind::SendFailed, task.section_index, task.number_index, &task.raw_number);
                    update.message_index = Some(task.message_index);
                    update.detail = Some(e.to_string());
                    sink.emit(CampaignEvent::Debug(update));
                }
            }

            state.advance_cursor();
            sink.emit(progress_event(task, &state));

            if !config.pacing_delay.is_zero() {
                tokio::time::sleep(config.pacing_delay).await;
            }
        }

        let summary = state.summary();
        info!(
            success = summary.success,
            errors = summary.errors,
            total = summary.total,
            "Campaign complete"
        );
        sink.emit(CampaignEvent::Complete(summary.clone()));
        Ok(summary)
    }

    /// Attempt the per-recipient image attachment.
    ///
    /// A failure counts one error against the recipient and is reported, but
    /// never blocks the text message that follows.
    async fn send_section_image(
        &self,
        task: &SendTask,
        image: &crate::planner::ImageAttachment,
        state: &mut CampaignState,
    ) {
        let sink = self.session.sink();

        let mut update = DebugUpdate::new(
            DebugKind::SendingImage,
            task.section_index,
            task.number_index,
            &task.raw_number,
        );
        update.bytes = Some(image.bytes.len());
        update.mime_type = Some(image.mime_type.clone());
        sink.emit(CampaignEvent::Debug(update));

        match self
            .session
            .channel()
            .send_image(&task.address, &image.bytes, &image.mime_type)
            .await
        {
            Ok(receipt) => {
                debug!(
                    number = %task.raw_number,
                    message_id = receipt.message_id.as_deref().unwrap_or_default(),
                    "Image sent"
                );
                let mut update = DebugUpdate::new(
                    DebugKind::ImageSent,
                    task.section_index,
                    task.number_index,
                    &task.raw_number,
                );
                update.message_id = receipt.message_id;
                sink.emit(CampaignEvent::Debug(update));
            }
            Err(e) => {
                state.record_attachment_error(task.recipient_key());
                warn!(number = %task.raw_number, error = %e, "Image send failed, continuing with text");
                let mut update = DebugUpdate::new(
                    DebugKind::ImageFailed,
                    task.section_index,
                    task.number_index,
                    &task.raw_number,
                );
                update.detail = Some(e.to_string());
                sink.emit(CampaignEvent::Debug(update));
                sink.emit(progress_event(task, state));
            }
        }
    }

    /// Emit the aborted completion event and produce the partial summary.
    fn finish_aborted(&self, state: &mut CampaignState) -> CampaignSummary {
        state.mark_aborted();
        let summary = state.summary();
        self.session
            .sink()
            .emit(CampaignEvent::Complete(summary.clone()));
        summary
    }
}

/// Build a progress event for `task` from the current counters.
fn progress_event(task: &SendTask, state: &CampaignState) -> CampaignEvent {
    let counters = state.counters(task.recipient_key());
    CampaignEvent::Progress(ProgressUpdate {
        current: state.cursor(),
        total: state.total(),
        success: state.success(),
        errors: state.errors(),
        section_index: task.section_index,
        number_index: task.number_index,
        number: task.raw_number.clone(),
        per_number_success: Some(counters.success),
        per_number_errors: Some(counters.errors),
        section_total: task.section_total,
        section_current: task.message_index as u32 + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::config::EngineConfig;
    use crate::events::RecordingSink;
    use crate::planner::{self, SectionInput};

    fn quick_config() -> EngineConfig {
        EngineConfig {
            pacing_delay: std::time::Duration::ZERO,
            ..EngineConfig::default()
        }
    }

    fn one_section(numbers: &[&str], messages: &[&str]) -> Vec<SectionInput> {
        vec![SectionInput {
            numbers: Some(numbers.iter().map(|s| s.to_string()).collect()),
            messages: Some(messages.iter().map(|s| s.to_string()).collect()),
            ..SectionInput::default()
        }]
    }

    #[tokio::test]
    async fn test_execute_refuses_disconnected_channel() {
        let session = Arc::new(SessionContext::new(
            Arc::new(MemoryChannel::disconnected()),
            Arc::new(RecordingSink::new()),
            quick_config(),
        ));
        let executor = CampaignExecutor::new(session);

        let sections = planner::normalize(&one_section(&["15550000001"], &["hi"])).unwrap();
        let plan = planner::plan(&sections, executor.resolver());

        let result = executor.execute(plan).await;
        assert!(matches!(result, Err(CampaignError::ChannelUnavailable)));
    }

    #[tokio::test]
    async fn test_execute_emits_start_before_progress() {
        let sink = Arc::new(RecordingSink::new());
        let session = Arc::new(SessionContext::new(
            Arc::new(MemoryChannel::new()),
            sink.clone(),
            quick_config(),
        ));
        let executor = CampaignExecutor::new(session);

        let sections = planner::normalize(&one_section(&["15550000001"], &["hi"])).unwrap();
        let plan = planner::plan(&sections, executor.resolver());
        executor.execute(plan).await.unwrap();

        let names: Vec<&str> = sink.snapshot().iter().map(|e| e.event_name()).collect();
        assert_eq!(names.first(), Some(&"sections_start"));
        assert_eq!(names.last(), Some(&"sections_complete"));
    }
}
