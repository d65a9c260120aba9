//! Input guard for the PCS frequency setpoint and the edit sessions that feed it

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{Action, FieldPath};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardError {
    #[error("Frequency {value:.2} Hz is outside the allowed range {min:.2}-{max:.2} Hz")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("An edit session is already open for {0}")]
    AlreadyEditing(String),

    #[error("No edit session open for {0}")]
    NoSession(String),
}

/// Closed interval of accepted setpoints, in Hz
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyEnvelope {
    pub min: f64,
    pub max: f64,
}

impl FrequencyEnvelope {
    pub const PCS: Self = Self {
        min: 59.77,
        max: 60.00,
    };

    /// Value the reset action drives the setpoint to
    pub const RESET_VALUE: f64 = 60.00;

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && (self.min - TOLERANCE..=self.max + TOLERANCE).contains(&value)
    }

    pub fn check(&self, value: f64) -> Result<f64, GuardError> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(GuardError::OutOfRange {
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

impl Default for FrequencyEnvelope {
    fn default() -> Self {
        Self::PCS
    }
}

// Absorbs float representation error only, far below any setpoint step
const TOLERANCE: f64 = 1e-9;

/// Pick the frequency command for a committed edit. `None` means unchanged.
pub fn select_action(original: f64, new: f64) -> Option<Action> {
    if new > original + TOLERANCE {
        Some(Action::PcsFreqUp)
    } else if new < original - TOLERANCE {
        Some(Action::PcsFreqDown)
    } else {
        None
    }
}

/// Validate a committed value against the envelope and derive its command
pub fn evaluate(
    envelope: &FrequencyEnvelope,
    original: f64,
    value: f64,
) -> Result<Option<Action>, GuardError> {
    envelope.check(value)?;
    Ok(select_action(original, value))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSession {
    pub key: String,
    #[serde(skip)]
    pub field: FieldPath,
    pub original_value: f64,
    pub opened_at: DateTime<Utc>,
}

/// At most one open session per field
#[derive(Debug, Default)]
pub struct EditSessions {
    sessions: HashMap<FieldPath, EditSession>,
}

impl EditSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, field: FieldPath, current: f64) -> Result<EditSession, GuardError> {
        if self.sessions.contains_key(&field) {
            return Err(GuardError::AlreadyEditing(field.key().to_string()));
        }

        let session = EditSession {
            key: field.key().to_string(),
            field,
            original_value: current,
            opened_at: Utc::now(),
        };
        self.sessions.insert(field, session.clone());
        Ok(session)
    }

    pub fn get(&self, field: FieldPath) -> Option<&EditSession> {
        self.sessions.get(&field)
    }

    pub fn is_open(&self, field: FieldPath) -> bool {
        self.sessions.contains_key(&field)
    }

    pub fn close(&mut self, field: FieldPath) -> Result<EditSession, GuardError> {
        self.sessions
            .remove(&field)
            .ok_or_else(|| GuardError::NoSession(field.key().to_string()))
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldPath> {
        self.sessions.keys()
    }
}
