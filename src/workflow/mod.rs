//! Workflow table and automatic transfer service.

pub mod notify;
pub mod service;
pub mod table;

pub use notify::{LoggingNotifier, SupervisorNotifier};
pub use service::{AutoTransferResult, TransferOptions, TransferValidation, WorkflowService};
pub use table::{next_department_type, step_for, WorkflowStep, WORKFLOW};
