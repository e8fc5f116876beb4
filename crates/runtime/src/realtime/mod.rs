// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime reconciliation.
//!
//! ```text
//! ┌──────────┐  ChangeEvent  ┌────────────────┐  Applied  ┌──────────┐
//! │ Realtime │──────────────►│ LiveCollection │──────────►│ Notifier │
//! │  (feed)  │  (in order)   │  (one task)    │           └──────────┘
//! └──────────┘               └───────┬────────┘
//!                                    │ apply
//!                            ┌───────▼──────────┐
//!                            │ EntityCollection │
//!                            └──────────────────┘
//! ```
//!
//! Each channel is drained by a single task, so events are applied one at
//! a time in delivery order.

mod live;
mod reconciler;
mod ws;

pub use live::{ChannelState, LiveCollection, LiveSources};
pub use reconciler::{Applied, EntityCollection, IgnoreReason};
pub use ws::WebSocketFeed;

#[cfg(test)]
mod reconciler_tests;
