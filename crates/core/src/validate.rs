// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local checks run before a write reaches the remote service.

use thiserror::Error;

use crate::record::{
    AdvisorProfile, AppointmentRecord, ChatMessage, ConsumerProfile, ProfileRecord,
};

// Input limits
pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_BIO_LENGTH: usize = 5_000;
pub const MAX_MESSAGE_LENGTH: usize = 4_000;
pub const MAX_APPOINTMENT_MINUTES: u32 = 480;
pub const MIN_CONSUMER_AGE: u32 = 18;
pub const MAX_CONSUMER_AGE: u32 = 120;
pub const MAX_YEARS_EXPERIENCE: u32 = 80;

/// A field that failed a local check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    FieldEmpty { field: &'static str },

    #[error("{field} is too long ({actual} > {max})")]
    FieldTooLong { field: &'static str, actual: usize, max: usize },

    #[error("{field} must be between {min} and {max}, got {actual}")]
    OutOfRange { field: &'static str, actual: u32, min: u32, max: u32 },

    #[error("{field} is not valid: {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

/// Something that can be checked before it is written.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn required(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::FieldEmpty { field });
    }
    if trimmed.len() > max {
        return Err(ValidationError::FieldTooLong { field, actual: trimmed.len(), max });
    }
    Ok(())
}

fn email(value: &str) -> Result<(), ValidationError> {
    required("email", value, MAX_NAME_LENGTH)?;
    match value.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::Invalid { field: "email", reason: "expected name@domain" }),
    }
}

fn in_range(field: &'static str, actual: u32, min: u32, max: u32) -> Result<(), ValidationError> {
    if actual < min || actual > max {
        return Err(ValidationError::OutOfRange { field, actual, min, max });
    }
    Ok(())
}

impl Validate for ConsumerProfile {
    fn validate(&self) -> Result<(), ValidationError> {
        required("name", &self.name, MAX_NAME_LENGTH)?;
        email(&self.email)?;
        if let Some(age) = self.age {
            in_range("age", age, MIN_CONSUMER_AGE, MAX_CONSUMER_AGE)?;
        }
        if let Some(zip) = &self.zip_code {
            let digits = zip.trim();
            if digits.len() != 5 || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(ValidationError::Invalid { field: "zip_code", reason: "expected 5 digits" });
            }
        }
        Ok(())
    }
}

impl Validate for AdvisorProfile {
    fn validate(&self) -> Result<(), ValidationError> {
        required("name", &self.name, MAX_NAME_LENGTH)?;
        email(&self.email)?;
        if let Some(years) = self.years_experience {
            in_range("years_experience", years, 0, MAX_YEARS_EXPERIENCE)?;
        }
        if let Some(bio) = &self.bio {
            if bio.len() > MAX_BIO_LENGTH {
                return Err(ValidationError::FieldTooLong {
                    field: "bio",
                    actual: bio.len(),
                    max: MAX_BIO_LENGTH,
                });
            }
        }
        Ok(())
    }
}

impl Validate for ProfileRecord {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ProfileRecord::Consumer(p) => p.validate(),
            ProfileRecord::Advisor(p) => p.validate(),
        }
    }
}

impl Validate for AppointmentRecord {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.consumer_id.is_empty() {
            return Err(ValidationError::FieldEmpty { field: "consumer_id" });
        }
        if self.advisor_id.is_empty() {
            return Err(ValidationError::FieldEmpty { field: "advisor_id" });
        }
        in_range("duration_minutes", self.duration_minutes, 1, MAX_APPOINTMENT_MINUTES)
    }
}

impl Validate for ChatMessage {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.match_id.is_empty() {
            return Err(ValidationError::FieldEmpty { field: "match_id" });
        }
        required("body", &self.body, MAX_MESSAGE_LENGTH)
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
