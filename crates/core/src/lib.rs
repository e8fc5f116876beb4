// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! dl-core: Shared types for the driftless data-resilience runtime
//!
//! This crate provides the entity records, cache keys, change events, error
//! taxonomy and clock primitives used by the `driftless` runtime and any
//! boundary adapter that talks to the remote data service.

pub mod classify;
pub mod clock;
pub mod error;
pub mod event;
pub mod key;
pub mod merge;
pub mod record;
pub mod validate;

pub use classify::{classify, ErrorKind, RemoteError};
pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use event::{ChangeEvent, ChangeKind};
pub use key::{CacheKey, TypeTag};
pub use merge::{map_record, merge_fields, patch_record};
pub use record::{
    AdvisorProfile, AppointmentRecord, AppointmentStatus, ChatMessage, ConsumerProfile,
    ItemCount, MatchRecord, MatchStatus, ProfileRecord, Record,
};
pub use validate::{Validate, ValidationError};
