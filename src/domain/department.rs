//! Department (work center) reference data.
//!
//! Departments are immutable reference data: they are not created or
//! destroyed by this subsystem. Each department carries a fixed type that
//! determines its place in the production sequence.

use crate::domain::types::DepartmentId;
use serde::{Deserialize, Serialize};

/// Fixed set of work center types.
///
/// The first seven form the main production sequence in order. HONEYCOMB
/// and MOTORI run outside the sequence and are never chained automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepartmentType {
    #[serde(rename = "CLEANROOM")]
    Cleanroom,
    #[serde(rename = "AUTOCLAVE")]
    Autoclave,
    #[serde(rename = "CONTROLLO_NUMERICO")]
    ControlloNumerico,
    #[serde(rename = "NDI")]
    Ndi,
    #[serde(rename = "MONTAGGIO")]
    Montaggio,
    #[serde(rename = "VERNICIATURA")]
    Verniciatura,
    #[serde(rename = "CONTROLLO_QUALITA")]
    ControlloQualita,
    #[serde(rename = "HONEYCOMB")]
    Honeycomb,
    #[serde(rename = "MOTORI")]
    Motori,
}

/// The main production sequence, in workflow order.
pub const MAIN_SEQUENCE: [DepartmentType; 7] = [
    DepartmentType::Cleanroom,
    DepartmentType::Autoclave,
    DepartmentType::ControlloNumerico,
    DepartmentType::Ndi,
    DepartmentType::Montaggio,
    DepartmentType::Verniciatura,
    DepartmentType::ControlloQualita,
];

impl DepartmentType {
    /// Wire name of the department type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cleanroom => "CLEANROOM",
            Self::Autoclave => "AUTOCLAVE",
            Self::ControlloNumerico => "CONTROLLO_NUMERICO",
            Self::Ndi => "NDI",
            Self::Montaggio => "MONTAGGIO",
            Self::Verniciatura => "VERNICIATURA",
            Self::ControlloQualita => "CONTROLLO_QUALITA",
            Self::Honeycomb => "HONEYCOMB",
            Self::Motori => "MOTORI",
        }
    }

    /// Parses a wire name back into a department type.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CLEANROOM" => Some(Self::Cleanroom),
            "AUTOCLAVE" => Some(Self::Autoclave),
            "CONTROLLO_NUMERICO" => Some(Self::ControlloNumerico),
            "NDI" => Some(Self::Ndi),
            "MONTAGGIO" => Some(Self::Montaggio),
            "VERNICIATURA" => Some(Self::Verniciatura),
            "CONTROLLO_QUALITA" => Some(Self::ControlloQualita),
            "HONEYCOMB" => Some(Self::Honeycomb),
            "MOTORI" => Some(Self::Motori),
            _ => None,
        }
    }

    /// Position of this type in the main sequence, or `None` for the two
    /// workflow-excluded types.
    pub fn sequence_position(&self) -> Option<usize> {
        MAIN_SEQUENCE.iter().position(|t| t == self)
    }

    /// Whether this type participates in automatic chaining.
    pub fn in_main_sequence(&self) -> bool {
        self.sequence_position().is_some()
    }

    /// The type immediately before this one in the main sequence.
    pub fn previous_in_sequence(&self) -> Option<DepartmentType> {
        match self.sequence_position() {
            Some(pos) if pos > 0 => Some(MAIN_SEQUENCE[pos - 1]),
            _ => None,
        }
    }
}

impl std::fmt::Display for DepartmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A manufacturing work center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    /// Short plant code, e.g. "REP-CR1".
    pub code: String,
    pub name: String,
    pub department_type: DepartmentType,
    /// Inactive departments never receive automatic transfers.
    pub is_active: bool,
}

impl Department {
    /// Creates an active department.
    pub fn new(code: &str, name: &str, department_type: DepartmentType) -> Self {
        Self {
            id: DepartmentId::new(),
            code: code.to_string(),
            name: name.to_string(),
            department_type,
            is_active: true,
        }
    }
}
