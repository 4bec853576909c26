//! Event domain model.
//!
//! An event opens one slot per domain. Each slot is either unassigned or
//! filled by exactly one assignment record.

use crate::model::domain::Domain;
use crate::model::validation::{
    normalize_name, normalize_optional_text, ValidationError, EVENT_DESCRIPTION_MAX_CHARS,
    EVENT_NAME_MAX_CHARS,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable event identifier.
pub type EventId = Uuid;

/// A unit of occurrence that may open an MVP slot and a Winner slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub description: Option<String>,
    /// Epoch milliseconds.
    pub event_date: i64,
    pub mvp_filled: bool,
    pub winner_filled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Event {
    /// Returns whether the slot for `domain` has an assignment.
    pub fn is_filled(&self, domain: Domain) -> bool {
        match domain {
            Domain::Mvp => self.mvp_filled,
            Domain::Winner => self.winner_filled,
        }
    }
}

/// Caller-supplied event fields for create and edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub name: String,
    pub description: Option<String>,
    /// Epoch milliseconds.
    pub event_date: i64,
}

impl EventDraft {
    pub fn new(name: impl Into<String>, event_date: i64) -> Self {
        Self {
            name: name.into(),
            description: None,
            event_date,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns a trimmed, validated copy.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: normalize_name("event name", &self.name, EVENT_NAME_MAX_CHARS)?,
            description: normalize_optional_text(
                "event description",
                self.description.as_deref(),
                EVENT_DESCRIPTION_MAX_CHARS,
            )?,
            event_date: self.event_date,
        })
    }
}
