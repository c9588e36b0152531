// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The per-recipient progress table.
//!
//! Consumes the campaign event stream and keeps one row per (section,
//! recipient-slot) pair. The executor's state is authoritative; this table
//! only mirrors it for display, so every update path tolerates missed or
//! unknown events instead of erroring.

use std::collections::BTreeMap;
use tracing::debug;

use herald_core::events::{CampaignEvent, CampaignSummary, ProgressUpdate};
use herald_core::state::RecipientKey;

use crate::types::{RecipientRow, RecipientStatus};

/// Last observed global counters, used to infer per-recipient deltas when an
/// event omits the explicit fields.
#[derive(Debug, Clone, Copy, Default)]
struct GlobalSnapshot {
    success: u32,
    errors: u32,
    current: u32,
}

/// Aggregates campaign progress events into a per-recipient status table.
#[derive(Debug, Default)]
pub struct ProgressAggregator {
    rows: BTreeMap<RecipientKey, RecipientRow>,
    last_global: GlobalSnapshot,
}

impl ProgressAggregator {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one section's recipients before the campaign starts.
    ///
    /// Call once per section with the same structure handed to the engine so
    /// the console knows each recipient's message total before any event
    /// arrives. Re-seeding a section resets its rows to pending.
    pub fn seed_section(&mut self, section_index: usize, numbers: &[String], message_count: usize) {
        for (number_index, number) in numbers.iter().enumerate() {
            self.rows.insert(
                (section_index, number_index),
                RecipientRow {
                    section_index,
                    number_index,
                    number: number.clone(),
                    total_messages: message_count as u32,
                    success: 0,
                    errors: 0,
                    status: RecipientStatus::Pending,
                },
            );
        }
    }

    /// Clear every row and forget the observed counters.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.last_global = GlobalSnapshot::default();
    }

    /// Feed one campaign event into the table.
    ///
    /// Start and debug events are ignored; progress events update a row,
    /// completion force-finalizes whatever is still open.
    pub fn apply(&mut self, event: &CampaignEvent) {
        match event {
            CampaignEvent::Progress(update) => self.reconcile(update),
            CampaignEvent::Complete(summary) => self.finalize(summary),
            CampaignEvent::Started(_) | CampaignEvent::Debug(_) => {}
        }
    }

    /// Update the matching row from one progress event.
    ///
    /// Explicit per-recipient fields win; when a sender omits them the update
    /// falls back to the change in global counters since the last observed
    /// event, attributed to the event's recipient. Both paths land here so
    /// they cannot diverge.
    pub fn reconcile(&mut self, update: &ProgressUpdate) {
        let key: RecipientKey = (update.section_index, update.number_index);
        let Some(row) = self.rows.get_mut(&key) else {
            debug!(
                section = update.section_index,
                slot = update.number_index,
                "Progress for unseeded recipient, ignoring"
            );
            return;
        };

        // Deltas are computed against the previous event's global counters;
        // saturation keeps a reordered stream from panicking the console.
        let delta_success = update.success.saturating_sub(self.last_global.success);
        let delta_errors = update.errors.saturating_sub(self.last_global.errors);
        self.last_global = GlobalSnapshot {
            success: update.success,
            errors: update.errors,
            current: update.current,
        };

        row.status = RecipientStatus::InProgress;

        match update.per_number_success {
            Some(explicit) => row.success = explicit,
            None => row.success += delta_success,
        }
        match update.per_number_errors {
            Some(explicit) => row.errors = explicit,
            None => row.errors += delta_errors,
        }

        if row.success + row.errors >= row.total_messages {
            row.status = RecipientStatus::from_counters(row.success, row.errors);
        }
    }

    /// Force-finalize rows the progress stream never resolved.
    ///
    /// Rows that saw any activity become partial, untouched rows failed;
    /// rows already resolved by [`reconcile`](Self::reconcile) keep their
    /// status.
    pub fn finalize(&mut self, _summary: &CampaignSummary) {
        for row in self.rows.values_mut() {
            if row.status.is_terminal() {
                continue;
            }
            row.status = if row.success >= row.total_messages {
                RecipientStatus::Sent
            } else if row.success > 0 || row.errors > 0 {
                RecipientStatus::Partial
            } else {
                RecipientStatus::Failed
            };
        }
    }

    /// Rows in (section, recipient-slot) order.
    pub fn rows(&self) -> impl Iterator<Item = &RecipientRow> {
        self.rows.values()
    }

    /// One recipient's row, if it was seeded.
    pub fn row(&self, section_index: usize, number_index: usize) -> Option<&RecipientRow> {
        self.rows.get(&(section_index, number_index))
    }

    /// Number of seeded recipients.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(
        key: (usize, usize),
        current: u32,
        success: u32,
        errors: u32,
        per: Option<(u32, u32)>,
    ) -> ProgressUpdate {
        ProgressUpdate {
            current,
            total: 4,
            success,
            errors,
            section_index: key.0,
            number_index: key.1,
            number: format!("155500000{}{}", key.0, key.1),
            per_number_success: per.map(|p| p.0),
            per_number_errors: per.map(|p| p.1),
            section_total: 2,
            section_current: 1,
        }
    }

    #[test]
    fn test_seeding_creates_pending_rows() {
        let mut table = ProgressAggregator::new();
        table.seed_section(0, &["a".into(), "b".into()], 3);

        assert_eq!(table.len(), 2);
        let row = table.row(0, 1).unwrap();
        assert_eq!(row.total_messages, 3);
        assert_eq!(row.status, RecipientStatus::Pending);
    }

    #[test]
    fn test_explicit_fields_win_over_deltas() {
        let mut table = ProgressAggregator::new();
        table.seed_section(0, &["a".into()], 2);

        table.reconcile(&progress((0, 0), 1, 1, 0, Some((1, 0))));
        let row = table.row(0, 0).unwrap();
        assert_eq!(row.success, 1);
        assert_eq!(row.status, RecipientStatus::InProgress);
    }

    #[test]
    fn test_delta_fallback_without_explicit_fields() {
        let mut table = ProgressAggregator::new();
        table.seed_section(0, &["a".into()], 2);

        table.reconcile(&progress((0, 0), 1, 1, 0, None));
        table.reconcile(&progress((0, 0), 2, 1, 1, None));

        let row = table.row(0, 0).unwrap();
        assert_eq!(row.success, 1);
        assert_eq!(row.errors, 1);
        assert_eq!(row.status, RecipientStatus::Partial);
    }

    #[test]
    fn test_unknown_recipient_is_ignored() {
        let mut table = ProgressAggregator::new();
        table.seed_section(0, &["a".into()], 2);

        table.reconcile(&progress((7, 7), 1, 1, 0, Some((1, 0))));
        assert_eq!(table.row(0, 0).unwrap().success, 0);
    }
}
