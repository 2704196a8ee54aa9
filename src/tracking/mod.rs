//! Event ingestion, status queries and department boards.

pub mod board;
pub mod service;

pub use board::{DepartmentBoard, DepartmentStatistics, WorkOrderSummary};
pub use service::{NewEventRequest, RecordedEvent, TrackingService, TrackingStatus};
