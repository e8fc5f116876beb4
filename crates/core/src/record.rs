// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Entity records held locally.
//!
//! Each record type is the local shape of one remote collection. Every field
//! that the remote may omit carries a serde default, so a pulled record never
//! has a field whose absence is ambiguous.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::key::TypeTag;

/// A record that lives in a remote collection and can be cached locally.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Tag used for cache keys and realtime channel names.
    const TAG: TypeTag;

    /// Stable entity identifier.
    fn id(&self) -> &str;
}

/// Number of domain items in a payload, reported in performance samples.
pub trait ItemCount {
    fn item_count(&self) -> usize;
}

impl<T> ItemCount for Vec<T> {
    fn item_count(&self) -> usize {
        self.len()
    }
}

impl<T: ItemCount> ItemCount for Option<T> {
    fn item_count(&self) -> usize {
        self.as_ref().map_or(0, ItemCount::item_count)
    }
}

impl ItemCount for serde_json::Value {
    fn item_count(&self) -> usize {
        match self {
            serde_json::Value::Array(items) => items.len(),
            serde_json::Value::Null => 0,
            _ => 1,
        }
    }
}

macro_rules! single_item {
    ($($ty:ty),*) => {
        $(impl ItemCount for $ty {
            fn item_count(&self) -> usize {
                1
            }
        })*
    };
}

single_item!(ProfileRecord, MatchRecord, AppointmentRecord, ChatMessage);

/// Profile of someone looking for an advisor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub age: Option<u32>,
    pub zip_code: Option<String>,
    pub income_range: Option<String>,
    pub investable_assets: Option<String>,
    pub risk_tolerance: Option<String>,
    pub goals: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Profile of a financial advisor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub firm: Option<String>,
    pub license_number: Option<String>,
    pub years_experience: Option<u32>,
    pub specialties: Vec<String>,
    pub bio: Option<String>,
    pub accepting_clients: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Authoritative profile shape, one of two roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ProfileRecord {
    Consumer(ConsumerProfile),
    Advisor(AdvisorProfile),
}

impl ProfileRecord {
    /// Returns the role name used on the wire.
    pub fn role(&self) -> &'static str {
        match self {
            ProfileRecord::Consumer(_) => "consumer",
            ProfileRecord::Advisor(_) => "advisor",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProfileRecord::Consumer(p) => &p.name,
            ProfileRecord::Advisor(p) => &p.name,
        }
    }

    pub fn as_consumer_mut(&mut self) -> Option<&mut ConsumerProfile> {
        match self {
            ProfileRecord::Consumer(p) => Some(p),
            ProfileRecord::Advisor(_) => None,
        }
    }

    pub fn as_advisor_mut(&mut self) -> Option<&mut AdvisorProfile> {
        match self {
            ProfileRecord::Advisor(p) => Some(p),
            ProfileRecord::Consumer(_) => None,
        }
    }
}

impl Record for ProfileRecord {
    const TAG: TypeTag = TypeTag::Profile;

    fn id(&self) -> &str {
        match self {
            ProfileRecord::Consumer(p) => &p.id,
            ProfileRecord::Advisor(p) => &p.id,
        }
    }
}

/// Lifecycle of a consumer/advisor match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

/// A consumer paired with an advisor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRecord {
    pub id: String,
    pub consumer_id: String,
    pub advisor_id: String,
    pub score: f64,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

impl Record for MatchRecord {
    const TAG: TypeTag = TypeTag::Match;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Lifecycle of an appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Requested,
    Confirmed,
    Cancelled,
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppointmentStatus::Requested => "requested",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// A scheduled meeting between a consumer and an advisor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentRecord {
    pub id: String,
    pub match_id: Option<String>,
    pub consumer_id: String,
    pub advisor_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

impl Record for AppointmentRecord {
    const TAG: TypeTag = TypeTag::Appointment;

    fn id(&self) -> &str {
        &self.id
    }
}

/// A chat message exchanged within a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    pub id: String,
    pub match_id: String,
    pub sender_id: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

impl Record for ChatMessage {
    const TAG: TypeTag = TypeTag::ChatMessage;

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
