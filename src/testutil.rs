//! Shared test fixtures: a seeded plant with the full department sequence,
//! an operator, a part, and the three services wired over a memory store.

use crate::clock::{Clock, ManualClock};
use crate::config::TrackingConfig;
use crate::domain::{
    Department, DepartmentId, DepartmentType, Part, Priority, TimestampUtc, UserAccount,
    WorkOrder, WorkOrderStatus, MAIN_SEQUENCE,
};
use crate::metrics::TimeMetricsService;
use crate::store::{MemoryStore, Store, WorkOrderStore};
use crate::tracking::TrackingService;
use crate::workflow::WorkflowService;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Fixed test epoch: 2024-03-04 06:00 UTC.
pub(crate) fn t0() -> TimestampUtc {
    TimestampUtc(Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).single().expect("valid date"))
}

/// A fully seeded plant over a memory store.
pub(crate) struct Plant {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub workflow: Arc<WorkflowService>,
    pub metrics: Arc<TimeMetricsService>,
    pub tracking: TrackingService,
    pub departments: HashMap<DepartmentType, Department>,
    pub operator: UserAccount,
    pub part: Part,
}

impl Plant {
    /// Seeds the seven main-sequence departments plus a honeycomb station,
    /// one active operator and one part. Retry backoff is shrunk to keep
    /// conflict tests fast.
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::starting_at(t0()));

        let mut config = TrackingConfig::default();
        config.retry.base_delay_ms = 1;
        config.retry.max_delay_ms = 2;

        let mut departments = HashMap::new();
        for department_type in MAIN_SEQUENCE {
            let department = Department::new(
                &format!("REP-{}", department_type.as_str()),
                department_type.as_str(),
                department_type,
            );
            departments.insert(department_type, department.clone());
            store.insert_department(department).await;
        }
        let honeycomb = Department::new("REP-HC", "Honeycomb", DepartmentType::Honeycomb);
        departments.insert(DepartmentType::Honeycomb, honeycomb.clone());
        store.insert_department(honeycomb).await;

        let operator = UserAccount::new("m.rossi");
        store.insert_user(operator.clone()).await;
        let part = Part::new("PN-8821-A", "Wing rib, composite");
        store.insert_part(part.clone()).await;

        let store_dyn: Arc<dyn Store> = store.clone();
        let workflow = Arc::new(WorkflowService::new(
            store_dyn.clone(),
            clock.clone(),
            &config,
        ));
        let metrics = Arc::new(TimeMetricsService::new(store_dyn.clone()));
        let tracking = TrackingService::new(
            store_dyn,
            workflow.clone(),
            metrics.clone(),
            clock.clone(),
        );

        Self {
            store,
            clock,
            workflow,
            metrics,
            tracking,
            departments,
            operator,
            part,
        }
    }

    /// Registers a work order directly in the given status.
    pub async fn register_work_order(&self, number: &str, status: WorkOrderStatus) -> WorkOrder {
        let mut work_order =
            WorkOrder::new(number, self.part.id, 2, Priority::Normal, self.clock.now());
        work_order.status = status;
        self.store
            .insert_work_order(work_order.clone())
            .await
            .expect("insert work order");
        work_order
    }

    pub fn department(&self, department_type: DepartmentType) -> &Department {
        self.departments
            .get(&department_type)
            .expect("department seeded")
    }

    pub fn department_id(&self, department_type: DepartmentType) -> DepartmentId {
        self.department(department_type).id
    }
}
