//! In-memory store implementation.
//!
//! Backs the test suite and embedded deployments. A single `RwLock` over
//! the whole data set makes each transactional method one critical
//! section, which is exactly the serializable-equivalent isolation the
//! engine assumes of the relational collaborator. An optional
//! [`EventJournal`] makes accepted events durable: the journal write
//! happens inside the critical section, before the in-memory mutation, so
//! a journal failure fails the whole transaction.

use crate::store::{
    CuringBatchStore, EventJournal, EventStore, MasterDataStore, MetricsStore, StatusUpdate,
    WorkOrderStore,
};
use crate::domain::{
    replay, Department, DepartmentId, DepartmentType, Part, PartId, PartTimeStatistic,
    ProductionEvent, TimeMetric, TrackingError, TrackingResult, UserAccount, UserId, WorkOrder,
    WorkOrderId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    departments: HashMap<DepartmentId, Department>,
    users: HashMap<UserId, UserAccount>,
    parts: HashMap<PartId, Part>,
    work_orders: HashMap<WorkOrderId, WorkOrder>,
    events: Vec<ProductionEvent>,
    time_metrics: HashMap<(WorkOrderId, DepartmentId), TimeMetric>,
    part_statistics: HashMap<(PartId, DepartmentId), PartTimeStatistic>,
    curing_batches: HashMap<WorkOrderId, String>,
}

impl Inner {
    /// Applies a guarded status write, bumping the version. Fails with a
    /// concurrency conflict when the version moved since validation.
    fn apply_status_update(&mut self, update: &StatusUpdate) -> TrackingResult<()> {
        let work_order = self
            .work_orders
            .get_mut(&update.work_order_id)
            .ok_or_else(|| TrackingError::not_found("work order", update.work_order_id))?;

        if work_order.version != update.expected_version {
            return Err(TrackingError::ConcurrencyConflict {
                work_order_id: update.work_order_id,
                message: format!(
                    "expected version {}, found {}",
                    update.expected_version, work_order.version
                ),
            });
        }

        work_order.status = update.new_status;
        work_order.version += 1;
        Ok(())
    }

    fn touch(&mut self, work_order_id: WorkOrderId, at: crate::domain::TimestampUtc) {
        if let Some(work_order) = self.work_orders.get_mut(&work_order_id) {
            work_order.updated_at = at;
        }
    }
}

/// In-memory implementation of the full [`crate::store::Store`] surface.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    journal: Option<EventJournal>,
}

impl MemoryStore {
    /// Empty store with no durable journal.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            journal: None,
        }
    }

    /// Store backed by a JSONL journal. Any existing journal content is
    /// replayed into the event log, so histories and metrics queries see
    /// pre-restart events.
    pub fn with_journal(journal: EventJournal) -> anyhow::Result<Self> {
        let events = journal.load()?;
        Ok(Self {
            inner: RwLock::new(Inner {
                events,
                ..Inner::default()
            }),
            journal: Some(journal),
        })
    }

    // ----- seeding (reference data is created outside this subsystem) -----

    pub async fn insert_department(&self, department: Department) {
        self.inner
            .write()
            .await
            .departments
            .insert(department.id, department);
    }

    pub async fn insert_user(&self, user: UserAccount) {
        self.inner.write().await.users.insert(user.id, user);
    }

    pub async fn insert_part(&self, part: Part) {
        self.inner.write().await.parts.insert(part.id, part);
    }

    /// Marks a work order as loaded in an active curing batch.
    pub async fn attach_curing_batch(&self, work_order_id: WorkOrderId, batch_code: &str) {
        self.inner
            .write()
            .await
            .curing_batches
            .insert(work_order_id, batch_code.to_string());
    }

    /// Releases a work order from its curing batch.
    pub async fn release_curing_batch(&self, work_order_id: WorkOrderId) {
        self.inner.write().await.curing_batches.remove(&work_order_id);
    }

    /// Recovery pass: recomputes each work order's cached status from the
    /// replayed event log. Used after loading a journal into a store whose
    /// work orders were re-registered from the relational collaborator.
    pub async fn recover_statuses(&self) {
        let mut inner = self.inner.write().await;
        let department_types: HashMap<DepartmentId, DepartmentType> = inner
            .departments
            .values()
            .map(|d| (d.id, d.department_type))
            .collect();

        let mut histories: HashMap<WorkOrderId, Vec<&ProductionEvent>> = HashMap::new();
        for event in &inner.events {
            histories.entry(event.work_order_id).or_default().push(event);
        }

        let mut recovered: HashMap<WorkOrderId, crate::domain::WorkOrderStatus> = HashMap::new();
        for (work_order_id, mut events) in histories {
            events.sort_by_key(|e| e.timestamp);
            let folded = replay(events.iter().filter_map(|e| {
                department_types
                    .get(&e.department_id)
                    .map(|ty| (*ty, e.event_type, e.is_automatic))
            }));
            recovered.insert(work_order_id, folded);
        }

        for (work_order_id, status) in recovered {
            if let Some(work_order) = inner.work_orders.get_mut(&work_order_id) {
                work_order.status = status;
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MasterDataStore for MemoryStore {
    async fn department(&self, id: DepartmentId) -> TrackingResult<Option<Department>> {
        Ok(self.inner.read().await.departments.get(&id).cloned())
    }

    async fn departments(&self) -> TrackingResult<Vec<Department>> {
        Ok(self.inner.read().await.departments.values().cloned().collect())
    }

    async fn active_department_of_type(
        &self,
        department_type: DepartmentType,
    ) -> TrackingResult<Option<Department>> {
        Ok(self
            .inner
            .read()
            .await
            .departments
            .values()
            .find(|d| d.department_type == department_type && d.is_active)
            .cloned())
    }

    async fn user(&self, id: UserId) -> TrackingResult<Option<UserAccount>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn part(&self, id: PartId) -> TrackingResult<Option<Part>> {
        Ok(self.inner.read().await.parts.get(&id).cloned())
    }
}

#[async_trait]
impl WorkOrderStore for MemoryStore {
    async fn work_order(&self, id: WorkOrderId) -> TrackingResult<Option<WorkOrder>> {
        Ok(self.inner.read().await.work_orders.get(&id).cloned())
    }

    async fn work_orders(&self) -> TrackingResult<Vec<WorkOrder>> {
        Ok(self.inner.read().await.work_orders.values().cloned().collect())
    }

    async fn insert_work_order(&self, work_order: WorkOrder) -> TrackingResult<()> {
        self.inner
            .write()
            .await
            .work_orders
            .insert(work_order.id, work_order);
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn events_for_work_order(
        &self,
        id: WorkOrderId,
    ) -> TrackingResult<Vec<ProductionEvent>> {
        let inner = self.inner.read().await;
        let mut events: Vec<ProductionEvent> = inner
            .events
            .iter()
            .filter(|e| e.work_order_id == id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    async fn append_with_status(
        &self,
        event: ProductionEvent,
        update: Option<StatusUpdate>,
    ) -> TrackingResult<WorkOrder> {
        let mut inner = self.inner.write().await;

        let work_order_id = event.work_order_id;
        if !inner.work_orders.contains_key(&work_order_id) {
            return Err(TrackingError::not_found("work order", work_order_id));
        }

        if let Some(update) = &update {
            // Version check first: nothing is journaled for a conflicted write.
            let current = inner
                .work_orders
                .get(&update.work_order_id)
                .ok_or_else(|| TrackingError::not_found("work order", update.work_order_id))?;
            if current.version != update.expected_version {
                return Err(TrackingError::ConcurrencyConflict {
                    work_order_id: update.work_order_id,
                    message: format!(
                        "expected version {}, found {}",
                        update.expected_version, current.version
                    ),
                });
            }
        }

        if let Some(journal) = &self.journal {
            journal
                .append_all(std::slice::from_ref(&event))
                .map_err(|e| TrackingError::Storage(e.to_string()))?;
        }

        if let Some(update) = &update {
            inner.apply_status_update(update)?;
        }
        inner.touch(work_order_id, event.timestamp);
        inner.events.push(event);

        inner
            .work_orders
            .get(&work_order_id)
            .cloned()
            .ok_or_else(|| TrackingError::not_found("work order", work_order_id))
    }

    async fn append_transfer(
        &self,
        update: StatusUpdate,
        exit_event: ProductionEvent,
        entry_event: Option<ProductionEvent>,
    ) -> TrackingResult<WorkOrder> {
        let mut inner = self.inner.write().await;

        let work_order_id = update.work_order_id;
        let current = inner
            .work_orders
            .get(&work_order_id)
            .ok_or_else(|| TrackingError::not_found("work order", work_order_id))?;
        if current.version != update.expected_version {
            return Err(TrackingError::ConcurrencyConflict {
                work_order_id,
                message: format!(
                    "expected version {}, found {}",
                    update.expected_version, current.version
                ),
            });
        }

        if let Some(journal) = &self.journal {
            let mut batch = vec![exit_event.clone()];
            if let Some(entry) = &entry_event {
                batch.push(entry.clone());
            }
            journal
                .append_all(&batch)
                .map_err(|e| TrackingError::Storage(e.to_string()))?;
        }

        inner.apply_status_update(&update)?;
        inner.touch(work_order_id, exit_event.timestamp);
        inner.events.push(exit_event);
        if let Some(entry) = entry_event {
            inner.events.push(entry);
        }

        inner
            .work_orders
            .get(&work_order_id)
            .cloned()
            .ok_or_else(|| TrackingError::not_found("work order", work_order_id))
    }
}

#[async_trait]
impl MetricsStore for MemoryStore {
    async fn time_metric(
        &self,
        work_order_id: WorkOrderId,
        department_id: DepartmentId,
    ) -> TrackingResult<Option<TimeMetric>> {
        Ok(self
            .inner
            .read()
            .await
            .time_metrics
            .get(&(work_order_id, department_id))
            .cloned())
    }

    async fn time_metrics_for_work_order(
        &self,
        work_order_id: WorkOrderId,
    ) -> TrackingResult<Vec<TimeMetric>> {
        Ok(self
            .inner
            .read()
            .await
            .time_metrics
            .values()
            .filter(|m| m.work_order_id == work_order_id)
            .cloned()
            .collect())
    }

    async fn upsert_time_metric(&self, metric: TimeMetric) -> TrackingResult<()> {
        self.inner
            .write()
            .await
            .time_metrics
            .insert((metric.work_order_id, metric.department_id), metric);
        Ok(())
    }

    async fn part_statistic(
        &self,
        part_id: PartId,
        department_id: DepartmentId,
    ) -> TrackingResult<Option<PartTimeStatistic>> {
        Ok(self
            .inner
            .read()
            .await
            .part_statistics
            .get(&(part_id, department_id))
            .cloned())
    }

    async fn upsert_part_statistic(&self, statistic: PartTimeStatistic) -> TrackingResult<()> {
        self.inner
            .write()
            .await
            .part_statistics
            .insert((statistic.part_id, statistic.department_id), statistic);
        Ok(())
    }
}

#[async_trait]
impl CuringBatchStore for MemoryStore {
    async fn active_curing_batch(
        &self,
        work_order_id: WorkOrderId,
    ) -> TrackingResult<Option<String>> {
        Ok(self
            .inner
            .read()
            .await
            .curing_batches
            .get(&work_order_id)
            .cloned())
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;
