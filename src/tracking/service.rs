//! Event ingestion and read-side queries.
//!
//! `create_production_event` is the single write path for operator
//! activity: it validates the actors and the requested transition against
//! the current persisted status, commits the event together with the
//! derived status in one atomic unit, and only then runs the best-effort
//! side effects (time metrics, and — for exits — the automatic transfer).
//! Side-effect failures degrade the response, never the committed event.

use crate::clock::Clock;
use crate::domain::types::OrderNumber;
use crate::domain::{
    derive_status, Department, DepartmentId, EventType, ProductionEvent, TimestampUtc,
    TrackingError, TrackingResult, UserAccount, UserId, WorkOrder, WorkOrderId, WorkOrderStatus,
};
use crate::metrics::TimeMetricsService;
use crate::store::{StatusUpdate, Store};
use crate::tracking::board::{self, Bucket, DepartmentBoard, WorkOrderSummary};
use crate::workflow::{AutoTransferResult, WorkflowService};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Input for [`TrackingService::create_production_event`].
#[derive(Debug, Clone)]
pub struct NewEventRequest {
    pub work_order_id: WorkOrderId,
    pub department_id: DepartmentId,
    pub event_type: EventType,
    pub user_id: UserId,
    pub notes: Option<String>,
    /// Operator-declared duration, recorded verbatim in milliseconds.
    pub duration_ms: Option<i64>,
}

/// A persisted event enriched for caller feedback.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedEvent {
    pub event: ProductionEvent,
    /// The work order as left by the whole request, auto-transfer included.
    pub work_order: WorkOrder,
    pub department: Department,
    pub user: UserAccount,
    /// Present on EXIT events: what the automatic transfer did, or why it
    /// could not run. Never turns the recorded event into a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_transfer: Option<AutoTransferResult>,
}

/// Answer to [`TrackingService::get_work_order_tracking_status`].
#[derive(Debug, Clone, Serialize)]
pub struct TrackingStatus {
    pub work_order_id: WorkOrderId,
    pub order_number: OrderNumber,
    pub status: WorkOrderStatus,
    /// Department of the current visit, when the order is mid-visit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_department: Option<Department>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event: Option<ProductionEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_in_current_department: Option<i64>,
    /// Minutes across all department visits, the open one included.
    pub total_production_minutes: i64,
    pub is_paused: bool,
}

/// Ingests production events and serves the read-side projections.
pub struct TrackingService {
    store: Arc<dyn Store>,
    workflow: Arc<WorkflowService>,
    metrics: Arc<TimeMetricsService>,
    clock: Arc<dyn Clock>,
}

impl TrackingService {
    pub fn new(
        store: Arc<dyn Store>,
        workflow: Arc<WorkflowService>,
        metrics: Arc<TimeMetricsService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            workflow,
            metrics,
            clock,
        }
    }

    /// Records an operator event.
    ///
    /// ENTRY and EXIT are checked against the current persisted status;
    /// ASSIGNED, PAUSE, RESUME and NOTE pass on existence checks alone.
    /// The event and the derived status commit atomically; metrics and
    /// auto-transfer run after the commit and only annotate the response.
    pub async fn create_production_event(
        &self,
        request: NewEventRequest,
    ) -> TrackingResult<RecordedEvent> {
        let (work_order, department, user) = self
            .load_participants(request.work_order_id, request.department_id, request.user_id)
            .await?;

        match request.event_type {
            EventType::Entry => {
                if !work_order.status.permits_entry(department.department_type) {
                    return Err(TrackingError::IllegalTransition {
                        message: format!(
                            "work order {} cannot enter {} while {}",
                            work_order.order_number,
                            department.department_type,
                            work_order.status
                        ),
                        expected: WorkOrderStatus::expected_for_entry(department.department_type),
                    });
                }
            }
            EventType::Exit => {
                if !work_order.status.permits_exit(department.department_type) {
                    return Err(TrackingError::IllegalTransition {
                        message: format!(
                            "work order {} cannot exit {} while {}",
                            work_order.order_number,
                            department.department_type,
                            work_order.status
                        ),
                        expected: WorkOrderStatus::In(department.department_type).as_wire(),
                    });
                }
            }
            EventType::Assigned | EventType::Pause | EventType::Resume | EventType::Note => {}
        }

        let mut event = ProductionEvent::manual(
            request.work_order_id,
            request.department_id,
            request.event_type,
            request.user_id,
            self.clock.now(),
        );
        if let Some(notes) = request.notes {
            event = event.with_notes(notes);
        }
        if let Some(duration_ms) = request.duration_ms {
            event = event.with_duration_ms(duration_ms);
        }

        let update = derive_status(department.department_type, request.event_type).map(
            |new_status| StatusUpdate {
                work_order_id: work_order.id,
                new_status,
                expected_version: work_order.version,
            },
        );

        let committed = self.store.append_with_status(event.clone(), update).await?;

        self.dispatch_metrics(&event).await;

        let auto_transfer = if request.event_type == EventType::Exit {
            Some(self.run_auto_transfer(&event).await)
        } else {
            None
        };

        // The transfer may have moved the order again; report final state.
        let work_order = self
            .store
            .work_order(committed.id)
            .await?
            .unwrap_or(committed);

        Ok(RecordedEvent {
            event,
            work_order,
            department,
            user,
            auto_transfer,
        })
    }

    /// Assigns a work order to a department. Only legal from CREATED.
    pub async fn create_assignment_event(
        &self,
        work_order_id: WorkOrderId,
        department_id: DepartmentId,
        user_id: UserId,
        notes: Option<String>,
    ) -> TrackingResult<RecordedEvent> {
        let (work_order, department, user) = self
            .load_participants(work_order_id, department_id, user_id)
            .await?;

        if work_order.status != WorkOrderStatus::Created {
            return Err(TrackingError::IllegalTransition {
                message: format!(
                    "work order {} is {}, assignment requires CREATED",
                    work_order.order_number, work_order.status
                ),
                expected: WorkOrderStatus::Created.as_wire(),
            });
        }

        let mut event = ProductionEvent::manual(
            work_order_id,
            department_id,
            EventType::Assigned,
            user_id,
            self.clock.now(),
        );
        if let Some(notes) = notes {
            event = event.with_notes(notes);
        }

        let update = StatusUpdate {
            work_order_id,
            new_status: WorkOrderStatus::AssignedTo(department.department_type),
            expected_version: work_order.version,
        };
        let work_order = self
            .store
            .append_with_status(event.clone(), Some(update))
            .await?;

        self.dispatch_metrics(&event).await;

        Ok(RecordedEvent {
            event,
            work_order,
            department,
            user,
            auto_transfer: None,
        })
    }

    /// Snapshot of one work order's position in the plant.
    pub async fn get_work_order_tracking_status(
        &self,
        work_order_id: WorkOrderId,
    ) -> TrackingResult<TrackingStatus> {
        let work_order = self
            .store
            .work_order(work_order_id)
            .await?
            .ok_or_else(|| TrackingError::not_found("work order", work_order_id))?;
        let events = self.store.events_for_work_order(work_order_id).await?;
        let now = self.clock.now();

        // Closed visits contribute entry-to-exit; open ones entry-to-now.
        let mut open_entries: HashMap<DepartmentId, TimestampUtc> = HashMap::new();
        let mut total_production_minutes = 0i64;
        for event in &events {
            match event.event_type {
                EventType::Entry => {
                    open_entries.insert(event.department_id, event.timestamp);
                }
                EventType::Exit => {
                    if let Some(entry_at) = open_entries.remove(&event.department_id) {
                        total_production_minutes += event.timestamp.minutes_since(entry_at);
                    }
                }
                _ => {}
            }
        }

        let mut current_department = None;
        let mut minutes_in_current_department = None;
        let mut is_paused = false;

        if let WorkOrderStatus::In(current_type) = work_order.status {
            let departments: HashMap<DepartmentId, Department> = self
                .store
                .departments()
                .await?
                .into_iter()
                .map(|d| (d.id, d))
                .collect();

            let open_visit = open_entries
                .iter()
                .filter_map(|(department_id, entry_at)| {
                    departments
                        .get(department_id)
                        .filter(|d| d.department_type == current_type)
                        .map(|d| (d.clone(), *entry_at))
                })
                .max_by_key(|(_, entry_at)| *entry_at);

            if let Some((department, entry_at)) = open_visit {
                let elapsed = now.minutes_since(entry_at);
                minutes_in_current_department = Some(elapsed);
                total_production_minutes += elapsed;
                is_paused = events
                    .iter()
                    .rev()
                    .filter(|e| e.department_id == department.id)
                    .find(|e| {
                        matches!(
                            e.event_type,
                            EventType::Entry | EventType::Pause | EventType::Resume
                        )
                    })
                    .map(|e| e.event_type == EventType::Pause)
                    .unwrap_or(false);
                current_department = Some(department);
            }
        }

        Ok(TrackingStatus {
            work_order_id,
            order_number: work_order.order_number.clone(),
            status: work_order.status,
            current_department,
            last_event: events.last().cloned(),
            minutes_in_current_department,
            total_production_minutes,
            is_paused,
        })
    }

    /// The department board: every relevant work order in exactly one of
    /// the four buckets, plus derived statistics.
    pub async fn get_department_work_order_list(
        &self,
        department_id: DepartmentId,
    ) -> TrackingResult<DepartmentBoard> {
        let department = self
            .store
            .department(department_id)
            .await?
            .ok_or_else(|| TrackingError::not_found("department", department_id))?;
        let departments: HashMap<DepartmentId, Department> = self
            .store
            .departments()
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();
        let now = self.clock.now();
        let own_position = department.department_type.sequence_position();

        let mut incoming = Vec::new();
        let mut in_preparation = Vec::new();
        let mut in_production = Vec::new();
        let mut completed = Vec::new();

        for work_order in self.store.work_orders().await? {
            let events = self.store.events_for_work_order(work_order.id).await?;
            let department_events: Vec<ProductionEvent> = events
                .iter()
                .filter(|e| e.department_id == department.id)
                .cloned()
                .collect();

            let has_entry_in_later = match own_position {
                Some(position) => events.iter().any(|e| {
                    e.event_type == EventType::Entry
                        && departments
                            .get(&e.department_id)
                            .and_then(|d| d.department_type.sequence_position())
                            .map(|p| p > position)
                            .unwrap_or(false)
                }),
                None => false,
            };

            let Some(bucket) = board::classify(
                department.department_type,
                &work_order,
                &department_events,
                has_entry_in_later,
            ) else {
                continue;
            };

            let summary = WorkOrderSummary {
                id: work_order.id,
                order_number: work_order.order_number.clone(),
                status: work_order.status,
                priority: work_order.priority,
                quantity: work_order.quantity,
                minutes_in_department: board::minutes_in_department(
                    bucket,
                    &department_events,
                    now,
                ),
            };

            match bucket {
                Bucket::Incoming => incoming.push(summary),
                Bucket::InPreparation => in_preparation.push(summary),
                Bucket::InProduction => in_production.push(summary),
                Bucket::Completed => completed.push(summary),
            }
        }

        for bucket in [
            &mut incoming,
            &mut in_preparation,
            &mut in_production,
            &mut completed,
        ] {
            bucket.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| a.order_number.as_str().cmp(b.order_number.as_str()))
            });
        }

        let statistics = board::statistics(&in_preparation, &in_production, &completed);

        Ok(DepartmentBoard {
            department,
            incoming,
            in_preparation,
            in_production,
            completed,
            statistics,
        })
    }

    async fn load_participants(
        &self,
        work_order_id: WorkOrderId,
        department_id: DepartmentId,
        user_id: UserId,
    ) -> TrackingResult<(WorkOrder, Department, UserAccount)> {
        let work_order = self
            .store
            .work_order(work_order_id)
            .await?
            .ok_or_else(|| TrackingError::not_found("work order", work_order_id))?;
        let department = self
            .store
            .department(department_id)
            .await?
            .ok_or_else(|| TrackingError::not_found("department", department_id))?;
        let user = self
            .store
            .user(user_id)
            .await?
            .ok_or_else(|| TrackingError::not_found("user", user_id))?;
        if !user.is_active {
            return Err(TrackingError::InactiveUser { user_id });
        }
        Ok((work_order, department, user))
    }

    /// Best-effort metrics dispatch: failures are logged, never raised.
    async fn dispatch_metrics(&self, event: &ProductionEvent) {
        if let Err(e) = self.metrics.process_event(event).await {
            tracing::warn!("Time metrics update failed for event {}: {}", event.id, e);
        }
    }

    /// Runs the automatic transfer for a committed EXIT and reports what
    /// happened, swallowing errors into the annotation.
    async fn run_auto_transfer(&self, event: &ProductionEvent) -> AutoTransferResult {
        match self
            .workflow
            .execute_auto_transfer(
                event.work_order_id,
                event.department_id,
                event.user_id,
                None,
            )
            .await
        {
            Ok(result) => {
                if result.success {
                    for appended in &result.events {
                        self.dispatch_metrics(appended).await;
                    }
                }
                result
            }
            Err(e) => {
                tracing::warn!(
                    "Auto-transfer failed for work order {}: {}",
                    event.work_order_id,
                    e
                );
                AutoTransferResult {
                    success: false,
                    message: e.to_string(),
                    next_department: None,
                    previous_status: None,
                    required_actions: Vec::new(),
                    events: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
