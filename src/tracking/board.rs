//! Department board projection.
//!
//! Buckets every work order relevant to a department into exactly one of
//! incoming / in-preparation / in-production / completed, by combining the
//! generic status classifier with the type of the order's most recent
//! event in the department. Statistics are derived on query, never stored.

use crate::domain::{
    Department, DepartmentType, EventType, Priority, ProductionEvent, StatusCategory,
    TimestampUtc, WorkOrder, WorkOrderId, WorkOrderStatus,
};
use crate::domain::types::OrderNumber;
use serde::Serialize;

/// One board row.
#[derive(Debug, Clone, Serialize)]
pub struct WorkOrderSummary {
    pub id: WorkOrderId,
    pub order_number: OrderNumber,
    pub status: WorkOrderStatus,
    pub priority: Priority,
    pub quantity: u32,
    /// Minutes in this department: entry to exit for completed rows,
    /// entry to now for in-production rows, absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_in_department: Option<i64>,
}

/// Derived per-department numbers. Active count is preparation plus
/// production; efficiency is min(100, completed / active × 100), rounded.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentStatistics {
    pub active_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_cycle_minutes: Option<f64>,
    pub efficiency_percent: u32,
}

/// The four disjoint buckets plus statistics for one department.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentBoard {
    pub department: Department,
    pub incoming: Vec<WorkOrderSummary>,
    pub in_preparation: Vec<WorkOrderSummary>,
    pub in_production: Vec<WorkOrderSummary>,
    pub completed: Vec<WorkOrderSummary>,
    pub statistics: DepartmentStatistics,
}

/// Bucket a work order lands in for a department, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bucket {
    Incoming,
    InPreparation,
    InProduction,
    Completed,
}

/// Classifies one work order against one department.
///
/// `department_events` is the order's history within this department,
/// timestamp-ordered. `has_entry_in_later` is true when the order already
/// recorded an ENTRY in a department strictly later in the fixed sequence
/// — such orders have left this board entirely.
pub(crate) fn classify(
    department_type: DepartmentType,
    work_order: &WorkOrder,
    department_events: &[ProductionEvent],
    has_entry_in_later: bool,
) -> Option<Bucket> {
    // The most recent status-relevant event overrides the generic
    // classifier; notes never decide a bucket.
    let latest = department_events
        .iter()
        .rev()
        .find(|e| e.event_type != EventType::Note);

    if let Some(event) = latest {
        return match event.event_type {
            EventType::Entry | EventType::Resume | EventType::Pause => Some(Bucket::InProduction),
            EventType::Exit => {
                if has_entry_in_later {
                    None
                } else {
                    Some(Bucket::Completed)
                }
            }
            EventType::Assigned => Some(Bucket::InPreparation),
            // Filtered out above; kept total for the compiler.
            EventType::Note => None,
        };
    }

    match work_order.status.category_for(department_type) {
        Some(StatusCategory::InPreparation) => Some(Bucket::InPreparation),
        Some(StatusCategory::InProduction) => Some(Bucket::InProduction),
        Some(StatusCategory::Completed) => Some(Bucket::Completed),
        None => {
            // Incoming: currently inside the previous department of the
            // sequence, nothing recorded here yet.
            let previous = department_type.previous_in_sequence()?;
            if work_order.status == WorkOrderStatus::In(previous) {
                Some(Bucket::Incoming)
            } else {
                None
            }
        }
    }
}

/// Minutes spent in the department for a bucketed order: first ENTRY to
/// last EXIT when completed, first unmatched ENTRY to `now` when still in
/// production.
pub(crate) fn minutes_in_department(
    bucket: Bucket,
    department_events: &[ProductionEvent],
    now: TimestampUtc,
) -> Option<i64> {
    match bucket {
        Bucket::Completed => {
            let entry = department_events
                .iter()
                .find(|e| e.event_type == EventType::Entry)?;
            let exit = department_events
                .iter()
                .rev()
                .find(|e| e.event_type == EventType::Exit)?;
            Some(exit.timestamp.minutes_since(entry.timestamp))
        }
        Bucket::InProduction => {
            let entry = department_events
                .iter()
                .rev()
                .find(|e| e.event_type == EventType::Entry)?;
            Some(now.minutes_since(entry.timestamp))
        }
        Bucket::Incoming | Bucket::InPreparation => None,
    }
}

/// Derives the board statistics from the filled buckets.
pub(crate) fn statistics(
    in_preparation: &[WorkOrderSummary],
    in_production: &[WorkOrderSummary],
    completed: &[WorkOrderSummary],
) -> DepartmentStatistics {
    let active_count = in_preparation.len() + in_production.len();

    let cycle_samples: Vec<i64> = completed
        .iter()
        .filter_map(|s| s.minutes_in_department)
        .collect();
    let average_cycle_minutes = if cycle_samples.is_empty() {
        None
    } else {
        Some(cycle_samples.iter().sum::<i64>() as f64 / cycle_samples.len() as f64)
    };

    let efficiency_percent = if active_count == 0 {
        if completed.is_empty() {
            0
        } else {
            100
        }
    } else {
        let ratio = completed.len() as f64 / active_count as f64 * 100.0;
        ratio.round().min(100.0) as u32
    };

    DepartmentStatistics {
        active_count,
        average_cycle_minutes,
        efficiency_percent,
    }
}

#[cfg(test)]
#[path = "tests/board_tests.rs"]
mod tests;
