//! The fixed workflow transition table.
//!
//! The department sequence is data, not code: an ordered array of
//! transition records (from, to, required status, target status). Next /
//! required / target lookups are plain queries over this table. The two
//! workflow-excluded types (HONEYCOMB, MOTORI) have no row and are never
//! chained automatically.

use crate::domain::{DepartmentType, WorkOrderStatus};

/// One transition of the fixed workflow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkflowStep {
    /// Department being left.
    pub from: DepartmentType,
    /// Department entered next. `None` marks the terminal completion step.
    pub to: Option<DepartmentType>,
    /// Status the work order must hold to leave `from`.
    pub required_status: WorkOrderStatus,
    /// Status the transfer sets on success.
    pub target_status: WorkOrderStatus,
}

/// The plant's production sequence, in order.
pub const WORKFLOW: [WorkflowStep; 7] = [
    WorkflowStep {
        from: DepartmentType::Cleanroom,
        to: Some(DepartmentType::Autoclave),
        required_status: WorkOrderStatus::DepartmentCompleted(DepartmentType::Cleanroom),
        target_status: WorkOrderStatus::In(DepartmentType::Autoclave),
    },
    WorkflowStep {
        from: DepartmentType::Autoclave,
        to: Some(DepartmentType::ControlloNumerico),
        required_status: WorkOrderStatus::DepartmentCompleted(DepartmentType::Autoclave),
        target_status: WorkOrderStatus::In(DepartmentType::ControlloNumerico),
    },
    WorkflowStep {
        from: DepartmentType::ControlloNumerico,
        to: Some(DepartmentType::Ndi),
        required_status: WorkOrderStatus::DepartmentCompleted(DepartmentType::ControlloNumerico),
        target_status: WorkOrderStatus::In(DepartmentType::Ndi),
    },
    WorkflowStep {
        from: DepartmentType::Ndi,
        to: Some(DepartmentType::Montaggio),
        required_status: WorkOrderStatus::DepartmentCompleted(DepartmentType::Ndi),
        target_status: WorkOrderStatus::In(DepartmentType::Montaggio),
    },
    WorkflowStep {
        from: DepartmentType::Montaggio,
        to: Some(DepartmentType::Verniciatura),
        required_status: WorkOrderStatus::DepartmentCompleted(DepartmentType::Montaggio),
        target_status: WorkOrderStatus::In(DepartmentType::Verniciatura),
    },
    WorkflowStep {
        from: DepartmentType::Verniciatura,
        to: Some(DepartmentType::ControlloQualita),
        required_status: WorkOrderStatus::DepartmentCompleted(DepartmentType::Verniciatura),
        target_status: WorkOrderStatus::In(DepartmentType::ControlloQualita),
    },
    WorkflowStep {
        from: DepartmentType::ControlloQualita,
        to: None,
        required_status: WorkOrderStatus::DepartmentCompleted(DepartmentType::ControlloQualita),
        target_status: WorkOrderStatus::Completed,
    },
];

/// The transition out of a department type, if it participates in the
/// automatic workflow.
pub fn step_for(from: DepartmentType) -> Option<&'static WorkflowStep> {
    WORKFLOW.iter().find(|step| step.from == from)
}

/// The next department type after `from`, or `None` when `from` is
/// terminal or workflow-excluded.
pub fn next_department_type(from: DepartmentType) -> Option<DepartmentType> {
    step_for(from).and_then(|step| step.to)
}

#[cfg(test)]
#[path = "tests/table_tests.rs"]
mod tests;
