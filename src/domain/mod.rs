//! Domain model for the production tracking engine.
//!
//! The model splits into immutable reference data (departments, parts,
//! users), the work order entity with its cached status projection, the
//! append-only production events, and the derived timing records.

pub mod department;
pub mod errors;
pub mod event;
pub mod metrics;
pub mod status;
pub mod types;
pub mod work_order;

pub use department::{Department, DepartmentType, MAIN_SEQUENCE};
pub use errors::{TrackingError, TrackingResult};
pub use event::{EventType, ProductionEvent};
pub use metrics::{PartTimeStatistic, TimeMetric};
pub use status::{derive_status, replay, StatusCategory, WorkOrderStatus};
pub use types::{
    DepartmentId, EventId, OrderNumber, PartId, TimestampUtc, UserId, WorkOrderId,
};
pub use work_order::{Part, Priority, UserAccount, WorkOrder};
