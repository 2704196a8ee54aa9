//! Automatic transfer of work orders along the workflow table.
//!
//! `WorkflowService` validates whether a work order may leave its current
//! department, computes the next one, and performs the atomic transfer:
//! one guarded status write plus the automatic EXIT and ENTRY events. The
//! guard is the work order version observed at validation time; a conflict
//! means another handler moved the order first, and only that class is
//! retried (bounded, exponential backoff with jitter).

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::config::{RetryPolicy, TrackingConfig};
use crate::domain::{
    Department, DepartmentId, DepartmentType, EventType, ProductionEvent, TrackingError,
    TrackingResult, UserId, WorkOrder, WorkOrderId, WorkOrderStatus,
};
use crate::store::{StatusUpdate, Store};
use crate::workflow::notify::{LoggingNotifier, SupervisorNotifier};
use crate::workflow::table;
use serde::Serialize;
use std::sync::Arc;

/// Caller-supplied switches for transfer validation.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Bypasses the required-status check. Dependency checks still apply.
    pub force_transfer: bool,
    /// Disables department-specific dependency checks when false.
    pub check_dependencies: bool,
}

impl Default for TransferOptions {
    /// The switches automatic chaining uses: no force, dependencies on.
    fn default() -> Self {
        Self {
            force_transfer: false,
            check_dependencies: true,
        }
    }
}

/// Validation report for a prospective transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferValidation {
    pub allowed: bool,
    /// Resolved next department; absent on the terminal completion step
    /// and on denials that fail before resolution.
    pub next_department: Option<Department>,
    /// Status the transfer would set. Present only when allowed.
    pub target_status: Option<WorkOrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_actions: Vec<String>,
}

/// Outcome of an automatic transfer attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AutoTransferResult {
    pub success: bool,
    pub message: String,
    /// Department the work order moved into; absent on failure and on the
    /// terminal completion step.
    pub next_department: Option<Department>,
    /// Status held before the transfer — the value `rollback_transfer`
    /// needs for manual recovery.
    pub previous_status: Option<WorkOrderStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_actions: Vec<String>,
    /// The automatic events the transfer appended, for listener dispatch.
    #[serde(skip)]
    pub events: Vec<ProductionEvent>,
}

/// Internal validation outcome with the optimistic guard attached.
enum Decision {
    Allowed {
        next_department: Option<Department>,
        target_status: WorkOrderStatus,
        observed_status: WorkOrderStatus,
        observed_version: u64,
    },
    Denied {
        reason: String,
        required_actions: Vec<String>,
        next_department: Option<Department>,
    },
}

/// Validates and executes automatic transfers.
pub struct WorkflowService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn SupervisorNotifier>,
    retry: RetryPolicy,
    /// Latency cache for next-department lookups. Never authoritative:
    /// entries expire on their TTL and can be dropped eagerly.
    department_lookup: TtlCache<DepartmentType, Department>,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: &TrackingConfig) -> Self {
        Self {
            store,
            clock,
            notifier: Arc::new(LoggingNotifier),
            retry: config.retry.clone(),
            department_lookup: TtlCache::new(config.cache.ttl(), config.cache.capacity),
        }
    }

    /// Replaces the default logging notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn SupervisorNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Next department type in the fixed sequence, or `None` when `from`
    /// is terminal or workflow-excluded.
    pub fn next_department(&self, from: DepartmentType) -> Option<DepartmentType> {
        table::next_department_type(from)
    }

    /// Drops a cached department lookup.
    pub fn invalidate_department_lookup(&self, department_type: DepartmentType) {
        self.department_lookup.invalidate(&department_type);
    }

    /// Reports whether the work order may leave `current_department_id`,
    /// and where it would go.
    pub async fn validate_transfer(
        &self,
        work_order_id: WorkOrderId,
        current_department_id: DepartmentId,
        options: &TransferOptions,
    ) -> TrackingResult<TransferValidation> {
        Ok(
            match self
                .decide(work_order_id, current_department_id, options)
                .await?
            {
                Decision::Allowed {
                    next_department,
                    target_status,
                    ..
                } => TransferValidation {
                    allowed: true,
                    next_department,
                    target_status: Some(target_status),
                    reason: None,
                    required_actions: Vec::new(),
                },
                Decision::Denied {
                    reason,
                    required_actions,
                    next_department,
                } => TransferValidation {
                    allowed: false,
                    next_department,
                    target_status: None,
                    reason: Some(reason),
                    required_actions,
                },
            },
        )
    }

    /// Moves the work order to the next department: guarded status write
    /// plus automatic EXIT and ENTRY events, in one atomic unit.
    ///
    /// Conflicts are retried up to the configured bound, re-validating
    /// each time; a precondition that no longer holds on retry yields a
    /// non-error "transfer not possible" outcome (another handler already
    /// moved the order). Exhausted retries surface the conflict.
    pub async fn execute_auto_transfer(
        &self,
        work_order_id: WorkOrderId,
        current_department_id: DepartmentId,
        user_id: UserId,
        notes: Option<String>,
    ) -> TrackingResult<AutoTransferResult> {
        let mut attempt: u32 = 1;
        loop {
            let decision = self
                .decide(
                    work_order_id,
                    current_department_id,
                    &TransferOptions::default(),
                )
                .await?;

            let (next_department, target_status, observed_status, observed_version) =
                match decision {
                    Decision::Denied {
                        reason,
                        required_actions,
                        next_department,
                    } => {
                        return Ok(AutoTransferResult {
                            success: false,
                            message: format!("transfer not possible: {}", reason),
                            next_department,
                            previous_status: None,
                            required_actions,
                            events: Vec::new(),
                        });
                    }
                    Decision::Allowed {
                        next_department,
                        target_status,
                        observed_status,
                        observed_version,
                    } => (
                        next_department,
                        target_status,
                        observed_status,
                        observed_version,
                    ),
                };

            let now = self.clock.now();
            let mut exit_event = ProductionEvent::automatic(
                work_order_id,
                current_department_id,
                EventType::Exit,
                user_id,
                now,
            );
            if let Some(notes) = &notes {
                exit_event = exit_event.with_notes(notes.clone());
            }
            let entry_event = next_department.as_ref().map(|department| {
                ProductionEvent::automatic(
                    work_order_id,
                    department.id,
                    EventType::Entry,
                    user_id,
                    now,
                )
            });

            let update = StatusUpdate {
                work_order_id,
                new_status: target_status,
                expected_version: observed_version,
            };

            let mut appended = vec![exit_event.clone()];
            if let Some(entry) = &entry_event {
                appended.push(entry.clone());
            }

            match self
                .store
                .append_transfer(update, exit_event, entry_event)
                .await
            {
                Ok(work_order) => {
                    if let Some(department) = &next_department {
                        self.spawn_notification(work_order, department.clone());
                    }
                    let message = match &next_department {
                        Some(department) => format!("transferred to {}", department.name),
                        None => "production completed".to_string(),
                    };
                    return Ok(AutoTransferResult {
                        success: true,
                        message,
                        next_department,
                        previous_status: Some(observed_status),
                        required_actions: Vec::new(),
                        events: appended,
                    });
                }
                Err(e) if e.is_retryable() => {
                    if attempt >= self.retry.max_attempts {
                        tracing::warn!(
                            "Auto-transfer for work order {} exhausted {} attempts: {}",
                            work_order_id,
                            attempt,
                            e
                        );
                        return Err(e);
                    }
                    let backoff = self.retry.backoff_for_attempt(attempt);
                    tracing::debug!(
                        "Auto-transfer conflict on work order {} (attempt {}), retrying in {:?}",
                        work_order_id,
                        attempt,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Manual recovery: restores a prior status and appends an audit NOTE.
    /// Never invoked automatically.
    pub async fn rollback_transfer(
        &self,
        work_order_id: WorkOrderId,
        previous_status: WorkOrderStatus,
        user_id: UserId,
        reason: &str,
    ) -> TrackingResult<WorkOrder> {
        let work_order = self
            .store
            .work_order(work_order_id)
            .await?
            .ok_or_else(|| TrackingError::not_found("work order", work_order_id))?;
        let user = self
            .store
            .user(user_id)
            .await?
            .ok_or_else(|| TrackingError::not_found("user", user_id))?;
        if !user.is_active {
            return Err(TrackingError::InactiveUser { user_id });
        }

        let department_id = self
            .rollback_note_department(&work_order, previous_status)
            .await?;

        let note = ProductionEvent::automatic(
            work_order_id,
            department_id,
            EventType::Note,
            user_id,
            self.clock.now(),
        )
        .with_notes(format!(
            "Transfer rolled back to {}: {}",
            previous_status.as_wire(),
            reason
        ));

        let update = StatusUpdate {
            work_order_id,
            new_status: previous_status,
            expected_version: work_order.version,
        };
        let restored = self.store.append_with_status(note, Some(update)).await?;

        // Manual recovery invalidates whatever the cache held about the
        // departments involved.
        self.department_lookup.clear();

        tracing::info!(
            "Work order {} rolled back to {} by {}: {}",
            restored.order_number,
            previous_status.as_wire(),
            user.username,
            reason
        );
        Ok(restored)
    }

    /// Department to anchor a rollback audit note on: the one named by the
    /// restored status, else the one of the most recent event.
    async fn rollback_note_department(
        &self,
        work_order: &WorkOrder,
        previous_status: WorkOrderStatus,
    ) -> TrackingResult<DepartmentId> {
        if let Some(department_type) = previous_status.department_type() {
            if let Some(department) = self
                .store
                .active_department_of_type(department_type)
                .await?
            {
                return Ok(department.id);
            }
        }
        self.store
            .events_for_work_order(work_order.id)
            .await?
            .last()
            .map(|event| event.department_id)
            .ok_or_else(|| TrackingError::not_found("department for rollback", work_order.id))
    }

    async fn decide(
        &self,
        work_order_id: WorkOrderId,
        current_department_id: DepartmentId,
        options: &TransferOptions,
    ) -> TrackingResult<Decision> {
        let work_order = self
            .store
            .work_order(work_order_id)
            .await?
            .ok_or_else(|| TrackingError::not_found("work order", work_order_id))?;
        let department = self
            .store
            .department(current_department_id)
            .await?
            .ok_or_else(|| TrackingError::not_found("department", current_department_id))?;

        let step = match table::step_for(department.department_type) {
            Some(step) => step,
            None => {
                return Ok(Decision::Denied {
                    reason: format!(
                        "department {} is excluded from the automatic workflow",
                        department.department_type
                    ),
                    required_actions: vec!["Advance the work order manually".to_string()],
                    next_department: None,
                });
            }
        };

        let next_department = match step.to {
            Some(next_type) => match self.active_department_cached(next_type).await? {
                Some(department) => Some(department),
                None => {
                    return Ok(Decision::Denied {
                        reason: format!("no active {} department available", next_type),
                        required_actions: vec![format!("Activate a {} department", next_type)],
                        next_department: None,
                    });
                }
            },
            None => None,
        };

        if work_order.status != step.required_status && !options.force_transfer {
            return Ok(Decision::Denied {
                reason: format!(
                    "work order {} is {}, must be {} to leave {}",
                    work_order.order_number,
                    work_order.status,
                    step.required_status,
                    department.code
                ),
                required_actions: vec![
                    format!("Bring the work order to {}", step.required_status),
                    "Repeat with force_transfer to override".to_string(),
                ],
                next_department,
            });
        }

        if options.check_dependencies {
            if let Some((reason, required_actions)) =
                self.dependency_block(&work_order, &department).await?
            {
                return Ok(Decision::Denied {
                    reason,
                    required_actions,
                    next_department,
                });
            }
        }

        Ok(Decision::Allowed {
            next_department,
            target_status: step.target_status,
            observed_status: work_order.status,
            observed_version: work_order.version,
        })
    }

    /// Department-specific preconditions. An autoclave refuses to release
    /// a work order still loaded in an active curing batch.
    async fn dependency_block(
        &self,
        work_order: &WorkOrder,
        department: &Department,
    ) -> TrackingResult<Option<(String, Vec<String>)>> {
        if department.department_type == DepartmentType::Autoclave {
            if let Some(batch) = self.store.active_curing_batch(work_order.id).await? {
                return Ok(Some((
                    format!(
                        "work order {} is loaded in active curing batch {}",
                        work_order.order_number, batch
                    ),
                    vec![format!("Complete or unload curing batch {}", batch)],
                )));
            }
        }
        Ok(None)
    }

    async fn active_department_cached(
        &self,
        department_type: DepartmentType,
    ) -> TrackingResult<Option<Department>> {
        if let Some(department) = self.department_lookup.get(&department_type) {
            return Ok(Some(department));
        }
        let department = self
            .store
            .active_department_of_type(department_type)
            .await?;
        if let Some(department) = &department {
            self.department_lookup
                .insert(department_type, department.clone());
        }
        Ok(department)
    }

    fn spawn_notification(&self, work_order: WorkOrder, department: Department) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.transfer_completed(&work_order, &department).await {
                tracing::warn!(
                    "Supervisor notification failed for {}: {}",
                    work_order.order_number,
                    e
                );
            }
        });
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
