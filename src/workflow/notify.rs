//! Supervisor notification hook.
//!
//! Fired after a successful automatic transfer, off the request path.
//! Failures are logged by the caller and never reach the operator who
//! posted the triggering event.

use crate::domain::{Department, WorkOrder};
use async_trait::async_trait;

/// Receives transfer notifications for department supervisors.
#[async_trait]
pub trait SupervisorNotifier: Send + Sync {
    /// Called once per successful transfer with the work order as moved
    /// and the department it arrived in.
    async fn transfer_completed(
        &self,
        work_order: &WorkOrder,
        next_department: &Department,
    ) -> anyhow::Result<()>;
}

/// Default notifier: announces arrivals on the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl SupervisorNotifier for LoggingNotifier {
    async fn transfer_completed(
        &self,
        work_order: &WorkOrder,
        next_department: &Department,
    ) -> anyhow::Result<()> {
        tracing::info!(
            "Work order {} arrived in {} ({})",
            work_order.order_number,
            next_department.name,
            next_department.department_type
        );
        Ok(())
    }
}
