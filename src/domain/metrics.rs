//! Time metric records and their per-part aggregates.
//!
//! One [`TimeMetric`] exists per (work order, department) visit; it is
//! created on ENTRY, accumulates pause time on RESUME, and is completed on
//! EXIT. [`PartTimeStatistic`] is the streaming aggregate per (part,
//! department): updated incrementally on each completion, never recomputed
//! from scratch. Both are owned exclusively by the metrics service.

use crate::domain::types::{DepartmentId, PartId, TimestampUtc, WorkOrderId};
use serde::{Deserialize, Serialize};

/// Timing record for one work order's visit to one department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeMetric {
    pub work_order_id: WorkOrderId,
    pub department_id: DepartmentId,
    pub entry_at: TimestampUtc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_at: Option<TimestampUtc>,
    /// Accumulated paused minutes within this visit.
    pub pause_minutes: i64,
    /// exit − entry, in minutes. Set on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advancement_minutes: Option<i64>,
    /// advancement − pause, floored at zero. Set on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_minutes: Option<i64>,
    /// Gap since the previous department's exit. Absent for the first
    /// department a work order ever enters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_minutes: Option<i64>,
    pub is_complete: bool,
}

impl TimeMetric {
    /// Opens a new (incomplete) record at department entry.
    pub fn opened(
        work_order_id: WorkOrderId,
        department_id: DepartmentId,
        entry_at: TimestampUtc,
        waiting_minutes: Option<i64>,
    ) -> Self {
        Self {
            work_order_id,
            department_id,
            entry_at,
            exit_at: None,
            pause_minutes: 0,
            advancement_minutes: None,
            working_minutes: None,
            waiting_minutes,
            is_complete: false,
        }
    }

    /// Completes the record at department exit.
    ///
    /// Working time is advancement minus accumulated pause, floored at
    /// zero: a pause that outlasts the recorded advancement never produces
    /// negative work.
    pub fn complete(&mut self, exit_at: TimestampUtc) {
        let advancement = exit_at.minutes_since(self.entry_at);
        self.exit_at = Some(exit_at);
        self.advancement_minutes = Some(advancement);
        self.working_minutes = Some((advancement - self.pause_minutes).max(0));
        self.is_complete = true;
    }

    /// Adds a finished pause interval to the accumulated pause time.
    pub fn add_pause_minutes(&mut self, minutes: i64) {
        self.pause_minutes += minutes.max(0);
    }
}

/// Streaming aggregate of completed visits per (part, department).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartTimeStatistic {
    pub part_id: PartId,
    pub department_id: DepartmentId,
    pub completed_count: u64,
    pub total_advancement_minutes: i64,
    pub total_working_minutes: i64,
    pub total_waiting_minutes: i64,
    pub avg_advancement_minutes: f64,
    pub avg_working_minutes: f64,
    pub avg_waiting_minutes: f64,
}

impl PartTimeStatistic {
    /// Empty aggregate for a (part, department) pair.
    pub fn empty(part_id: PartId, department_id: DepartmentId) -> Self {
        Self {
            part_id,
            department_id,
            completed_count: 0,
            total_advancement_minutes: 0,
            total_working_minutes: 0,
            total_waiting_minutes: 0,
            avg_advancement_minutes: 0.0,
            avg_working_minutes: 0.0,
            avg_waiting_minutes: 0.0,
        }
    }

    /// Folds one completed visit into the running totals and recomputes the
    /// averages as totals over count. A missing waiting time (first
    /// department of an order) contributes zero minutes.
    pub fn record_completion(
        &mut self,
        advancement_minutes: i64,
        working_minutes: i64,
        waiting_minutes: Option<i64>,
    ) {
        self.completed_count += 1;
        self.total_advancement_minutes += advancement_minutes;
        self.total_working_minutes += working_minutes;
        self.total_waiting_minutes += waiting_minutes.unwrap_or(0);

        let count = self.completed_count as f64;
        self.avg_advancement_minutes = self.total_advancement_minutes as f64 / count;
        self.avg_working_minutes = self.total_working_minutes as f64 / count;
        self.avg_waiting_minutes = self.total_waiting_minutes as f64 / count;
    }
}

#[cfg(test)]
#[path = "tests/metrics_model_tests.rs"]
mod tests;
