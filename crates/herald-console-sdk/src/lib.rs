// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Herald Console SDK - Client-side campaign progress aggregation.
//!
//! Supervising consoles observe a campaign through a fire-and-forget event
//! stream. This crate maintains the per-recipient status table a console
//! renders from that stream: it is seeded from the same section structure the
//! engine was given (so totals are known before any event arrives), updated
//! from `sections_progress` events, and force-finalized on
//! `sections_complete`.
//!
//! The table is a display aid, not a ledger: events may be dropped by a slow
//! or late-joining observer, and the aggregator degrades gracefully instead
//! of failing - unknown recipients are ignored and missing per-recipient
//! fields are reconstructed from global counter deltas.
//!
//! # Quick Start
//!
//! ```
//! use herald_console_sdk::ProgressAggregator;
//! use herald_core::events::CampaignEvent;
//!
//! let mut table = ProgressAggregator::new();
//! // Same structure the campaign was started with: one section, two
//! // recipients, two messages each.
//! table.seed_section(0, &["15550000001".into(), "15550000002".into()], 2);
//!
//! # let incoming: Vec<CampaignEvent> = vec![];
//! for event in incoming {
//!     table.apply(&event);
//! }
//!
//! for row in table.rows() {
//!     println!("{} {}/{} {:?}", row.number, row.success, row.total_messages, row.status);
//! }
//! ```

/// The per-recipient aggregation table.
pub mod aggregator;

/// Row and status types for the console table.
pub mod types;

pub use aggregator::ProgressAggregator;
pub use types::{RecipientRow, RecipientStatus};
