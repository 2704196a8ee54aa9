//! Production events: the immutable facts of the tracking engine.
//!
//! An event records one interaction between a work order and a department.
//! Events are appended once and never updated or deleted; the event log,
//! ordered by timestamp, is the source of truth for a work order's history.

use crate::domain::types::{DepartmentId, EventId, TimestampUtc, UserId, WorkOrderId};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Kind of production event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Assigned,
    Entry,
    Exit,
    Pause,
    Resume,
    Note,
}

impl EventType {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "ASSIGNED",
            Self::Entry => "ENTRY",
            Self::Exit => "EXIT",
            Self::Pause => "PAUSE",
            Self::Resume => "RESUME",
            Self::Note => "NOTE",
        }
    }

    /// Parses a wire name back into an event type.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ASSIGNED" => Some(Self::Assigned),
            "ENTRY" => Some(Self::Entry),
            "EXIT" => Some(Self::Exit),
            "PAUSE" => Some(Self::Pause),
            "RESUME" => Some(Self::Resume),
            "NOTE" => Some(Self::Note),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| D::Error::custom(format!("unknown event type '{}'", s)))
    }
}

/// An immutable production fact tying a work order to a department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionEvent {
    pub id: EventId,
    pub work_order_id: WorkOrderId,
    pub department_id: DepartmentId,
    pub event_type: EventType,
    /// Acting user. Automatic events carry the user that triggered the
    /// originating manual event.
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Operator-declared duration, recorded verbatim in milliseconds.
    /// Derived timing lives in the time metric records, not here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    pub timestamp: TimestampUtc,
    /// True for events appended by the workflow engine itself (transfers,
    /// rollback audit notes), false for operator-posted events.
    pub is_automatic: bool,
}

impl ProductionEvent {
    /// Creates a manual (operator-posted) event.
    pub fn manual(
        work_order_id: WorkOrderId,
        department_id: DepartmentId,
        event_type: EventType,
        user_id: UserId,
        timestamp: TimestampUtc,
    ) -> Self {
        Self {
            id: EventId::new(),
            work_order_id,
            department_id,
            event_type,
            user_id,
            notes: None,
            duration_ms: None,
            timestamp,
            is_automatic: false,
        }
    }

    /// Creates an automatic (engine-generated) event.
    pub fn automatic(
        work_order_id: WorkOrderId,
        department_id: DepartmentId,
        event_type: EventType,
        user_id: UserId,
        timestamp: TimestampUtc,
    ) -> Self {
        Self {
            is_automatic: true,
            ..Self::manual(work_order_id, department_id, event_type, user_id, timestamp)
        }
    }

    /// Attaches a free-text note.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Attaches a verbatim duration in milliseconds.
    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[cfg(test)]
#[path = "tests/event_tests.rs"]
mod tests;
