//! Repository-style interfaces over the relational collaborator.
//!
//! The concrete engine behind these traits is irrelevant to the engine's
//! design; services depend on `Arc<dyn Store>`. The two transactional
//! operations on [`EventStore`] are the units of mutual exclusion: each
//! couples an event append with a status write guarded by the work order's
//! monotonic version, and fails with a concurrency conflict when the
//! version moved since validation (the zero-rows-affected analog).

pub mod journal;
pub mod memory;

pub use journal::EventJournal;
pub use memory::MemoryStore;

use crate::domain::{
    Department, DepartmentId, DepartmentType, Part, PartId, PartTimeStatistic, ProductionEvent,
    TimeMetric, TrackingResult, UserAccount, UserId, WorkOrder, WorkOrderId, WorkOrderStatus,
};
use async_trait::async_trait;

/// A guarded status write: applied only if the work order's version still
/// equals `expected_version`, bumping the version on success.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub work_order_id: WorkOrderId,
    pub new_status: WorkOrderStatus,
    pub expected_version: u64,
}

/// Read access to immutable reference data.
#[async_trait]
pub trait MasterDataStore: Send + Sync {
    async fn department(&self, id: DepartmentId) -> TrackingResult<Option<Department>>;
    async fn departments(&self) -> TrackingResult<Vec<Department>>;
    /// The active department of the given type, if one exists. At most one
    /// department per type is active in a plant.
    async fn active_department_of_type(
        &self,
        department_type: DepartmentType,
    ) -> TrackingResult<Option<Department>>;
    async fn user(&self, id: UserId) -> TrackingResult<Option<UserAccount>>;
    async fn part(&self, id: PartId) -> TrackingResult<Option<Part>>;
}

/// Work order reads and registration.
#[async_trait]
pub trait WorkOrderStore: Send + Sync {
    async fn work_order(&self, id: WorkOrderId) -> TrackingResult<Option<WorkOrder>>;
    async fn work_orders(&self) -> TrackingResult<Vec<WorkOrder>>;
    async fn insert_work_order(&self, work_order: WorkOrder) -> TrackingResult<()>;
}

/// The append-only event log and its transactional write paths.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Full event history of a work order, ordered by timestamp.
    async fn events_for_work_order(
        &self,
        id: WorkOrderId,
    ) -> TrackingResult<Vec<ProductionEvent>>;

    /// Atomically appends `event` and applies the status write, if any.
    /// Either both happen or neither does. Returns the work order as left
    /// by the write.
    async fn append_with_status(
        &self,
        event: ProductionEvent,
        update: Option<StatusUpdate>,
    ) -> TrackingResult<WorkOrder>;

    /// Atomic transfer unit: guarded status write plus the automatic EXIT
    /// and (when a next department exists) ENTRY events.
    async fn append_transfer(
        &self,
        update: StatusUpdate,
        exit_event: ProductionEvent,
        entry_event: Option<ProductionEvent>,
    ) -> TrackingResult<WorkOrder>;
}

/// Timing records and their per-part aggregates. Owned by the metrics
/// service; nothing else writes here.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn time_metric(
        &self,
        work_order_id: WorkOrderId,
        department_id: DepartmentId,
    ) -> TrackingResult<Option<TimeMetric>>;
    async fn time_metrics_for_work_order(
        &self,
        work_order_id: WorkOrderId,
    ) -> TrackingResult<Vec<TimeMetric>>;
    async fn upsert_time_metric(&self, metric: TimeMetric) -> TrackingResult<()>;
    async fn part_statistic(
        &self,
        part_id: PartId,
        department_id: DepartmentId,
    ) -> TrackingResult<Option<PartTimeStatistic>>;
    async fn upsert_part_statistic(&self, statistic: PartTimeStatistic) -> TrackingResult<()>;
}

/// Curing-batch attachment lookups, used by the autoclave dependency check.
/// Batch lifecycle itself belongs to the external layout optimizer.
#[async_trait]
pub trait CuringBatchStore: Send + Sync {
    /// Code of the active curing batch this work order is loaded in, if any.
    async fn active_curing_batch(
        &self,
        work_order_id: WorkOrderId,
    ) -> TrackingResult<Option<String>>;
}

/// The full store surface the services consume.
pub trait Store:
    MasterDataStore + WorkOrderStore + EventStore + MetricsStore + CuringBatchStore
{
}

impl<T> Store for T where
    T: MasterDataStore + WorkOrderStore + EventStore + MetricsStore + CuringBatchStore
{
}
