//! Work order lifecycle status.
//!
//! Status is a closed enumeration forming a total order along the main
//! production sequence, plus the terminal/exception states. It is never set
//! directly by API consumers: tracking derives it from accepted events via
//! the deterministic (department type, event type) table below, and the
//! workflow service moves it along the transition table. The cached status
//! column on the work order is a projection of the event log.

use crate::domain::department::DepartmentType;
use crate::domain::event::EventType;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lifecycle status of a work order.
///
/// Wire form is the closed string set `CREATED`, `ASSIGNED_TO_<TYPE>`,
/// `IN_<TYPE>`, `<TYPE>_COMPLETED`, `COMPLETED`, `ON_HOLD`, `CANCELLED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkOrderStatus {
    /// Freshly registered, no department activity yet.
    Created,
    /// Assigned to a department but not yet entered.
    AssignedTo(DepartmentType),
    /// Currently being worked in a department.
    In(DepartmentType),
    /// Finished in a department, awaiting transfer to the next one.
    DepartmentCompleted(DepartmentType),
    /// All production finished. Terminal.
    Completed,
    /// Suspended outside the normal flow. Set by out-of-scope surfaces.
    OnHold,
    /// Abandoned. Terminal. Set by out-of-scope surfaces.
    Cancelled,
}

impl WorkOrderStatus {
    /// Wire string for this status.
    pub fn as_wire(&self) -> String {
        match self {
            Self::Created => "CREATED".to_string(),
            Self::AssignedTo(t) => format!("ASSIGNED_TO_{}", t.as_str()),
            Self::In(t) => format!("IN_{}", t.as_str()),
            Self::DepartmentCompleted(t) => format!("{}_COMPLETED", t.as_str()),
            Self::Completed => "COMPLETED".to_string(),
            Self::OnHold => "ON_HOLD".to_string(),
            Self::Cancelled => "CANCELLED".to_string(),
        }
    }

    /// Parses a wire string. The fixed words are matched before the
    /// prefixed forms, so `COMPLETED` never reads as a department suffix.
    pub fn parse_wire(s: &str) -> Option<Self> {
        match s {
            "CREATED" => return Some(Self::Created),
            "COMPLETED" => return Some(Self::Completed),
            "ON_HOLD" => return Some(Self::OnHold),
            "CANCELLED" => return Some(Self::Cancelled),
            _ => {}
        }
        if let Some(rest) = s.strip_prefix("ASSIGNED_TO_") {
            return DepartmentType::parse(rest).map(Self::AssignedTo);
        }
        if let Some(rest) = s.strip_prefix("IN_") {
            return DepartmentType::parse(rest).map(Self::In);
        }
        if let Some(rest) = s.strip_suffix("_COMPLETED") {
            return DepartmentType::parse(rest).map(Self::DepartmentCompleted);
        }
        None
    }

    /// The department named by this status, if any.
    pub fn department_type(&self) -> Option<DepartmentType> {
        match self {
            Self::AssignedTo(t) | Self::In(t) | Self::DepartmentCompleted(t) => Some(*t),
            _ => None,
        }
    }

    /// Whether a work order with this status may record an ENTRY into a
    /// department of the given type.
    ///
    /// Main-sequence departments accept orders assigned to them, orders
    /// that completed the previous department, and (for the first station)
    /// freshly created orders. The two workflow-excluded types are routed
    /// manually: they additionally accept any `<TYPE>_COMPLETED` order.
    pub fn permits_entry(&self, department: DepartmentType) -> bool {
        match self {
            Self::AssignedTo(t) => *t == department,
            Self::Created => {
                department == DepartmentType::Cleanroom || !department.in_main_sequence()
            }
            Self::DepartmentCompleted(done) => {
                if !department.in_main_sequence() {
                    return true;
                }
                department.previous_in_sequence() == Some(*done)
            }
            _ => false,
        }
    }

    /// Whether a work order with this status may record an EXIT from a
    /// department of the given type.
    pub fn permits_exit(&self, department: DepartmentType) -> bool {
        *self == Self::In(department)
    }

    /// Human-readable description of the statuses that would permit an
    /// ENTRY into the given department type. Used in illegal-transition
    /// errors.
    pub fn expected_for_entry(department: DepartmentType) -> String {
        let assigned = Self::AssignedTo(department).as_wire();
        match department.previous_in_sequence() {
            Some(prev) => format!(
                "{} or {}",
                assigned,
                Self::DepartmentCompleted(prev).as_wire()
            ),
            None if department == DepartmentType::Cleanroom => {
                format!("CREATED or {}", assigned)
            }
            None => format!("CREATED, {} or any *_COMPLETED", assigned),
        }
    }
}

impl std::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

impl Serialize for WorkOrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_wire())
    }
}

impl<'de> Deserialize<'de> for WorkOrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_wire(&s)
            .ok_or_else(|| D::Error::custom(format!("unknown work order status '{}'", s)))
    }
}

/// Deterministic status derivation, keyed by (department type, event type).
///
/// `None` means the event does not move the status: pauses, resumes and
/// notes are recorded in the log but leave the cached status untouched.
pub fn derive_status(department: DepartmentType, event: EventType) -> Option<WorkOrderStatus> {
    match event {
        EventType::Assigned => Some(WorkOrderStatus::AssignedTo(department)),
        EventType::Entry => Some(WorkOrderStatus::In(department)),
        EventType::Exit => Some(WorkOrderStatus::DepartmentCompleted(department)),
        EventType::Pause | EventType::Resume | EventType::Note => None,
    }
}

/// Folds a timestamp-ordered event history into the status it reconstructs.
///
/// Items are (department type, event type, automatic flag). The fold applies
/// [`derive_status`] event by event, with one addition: the automatic EXIT
/// appended by the terminal transfer step (final quality control, which has
/// no next department) lands the order on `COMPLETED`. The cached status on
/// the work order must always equal the result of this fold.
pub fn replay<I>(events: I) -> WorkOrderStatus
where
    I: IntoIterator<Item = (DepartmentType, EventType, bool)>,
{
    let mut status = WorkOrderStatus::Created;
    for (department, event, automatic) in events {
        if automatic
            && event == EventType::Exit
            && department == DepartmentType::ControlloQualita
        {
            status = WorkOrderStatus::Completed;
            continue;
        }
        if let Some(next) = derive_status(department, event) {
            status = next;
        }
    }
    status
}

/// Board bucket assigned to a status by the generic classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    InPreparation,
    InProduction,
    Completed,
}

impl WorkOrderStatus {
    /// Classifies this status against a department's own type.
    ///
    /// Recognizes `ASSIGNED_TO_<type>`, `IN_<type>` and `<type>_COMPLETED`
    /// for the department itself; every other status (including `CREATED`)
    /// is not relevant to the department and yields `None`.
    pub fn category_for(&self, department: DepartmentType) -> Option<StatusCategory> {
        match self {
            Self::AssignedTo(t) if *t == department => Some(StatusCategory::InPreparation),
            Self::In(t) if *t == department => Some(StatusCategory::InProduction),
            Self::DepartmentCompleted(t) if *t == department => Some(StatusCategory::Completed),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
