//! Time metrics listener.
//!
//! Invoked after every persisted event. Maintains the per-(work order,
//! department) timing record and folds completed visits into the
//! per-(part, department) running averages. Nothing here may fail the
//! triggering event: callers log errors from [`TimeMetricsService::process_event`]
//! and move on.

use crate::domain::{
    EventType, PartTimeStatistic, ProductionEvent, TimeMetric, TrackingResult,
};
use crate::store::Store;
use std::sync::Arc;

/// Derives time metrics from the event stream.
pub struct TimeMetricsService {
    store: Arc<dyn Store>,
}

impl TimeMetricsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Listener entry point, dispatched by event type.
    ///
    /// The event is already persisted when this runs, so history queries
    /// include it.
    pub async fn process_event(&self, event: &ProductionEvent) -> TrackingResult<()> {
        match event.event_type {
            EventType::Entry => self.on_entry(event).await,
            EventType::Exit => self.on_exit(event).await,
            EventType::Resume => self.on_resume(event).await,
            EventType::Assigned | EventType::Pause | EventType::Note => Ok(()),
        }
    }

    /// ENTRY: open the visit record, with the waiting gap since the most
    /// recent EXIT in any other department. The first department a work
    /// order ever enters has no waiting time.
    async fn on_entry(&self, event: &ProductionEvent) -> TrackingResult<()> {
        let history = self.store.events_for_work_order(event.work_order_id).await?;
        let previous_exit = history
            .iter()
            .filter(|e| {
                e.event_type == EventType::Exit
                    && e.department_id != event.department_id
                    && e.timestamp <= event.timestamp
            })
            .max_by_key(|e| e.timestamp);

        let waiting_minutes =
            previous_exit.map(|exit| event.timestamp.minutes_since(exit.timestamp));

        let metric = TimeMetric::opened(
            event.work_order_id,
            event.department_id,
            event.timestamp,
            waiting_minutes,
        );
        self.store.upsert_time_metric(metric).await
    }

    /// EXIT: complete the visit record and fold it into the part
    /// statistic. An EXIT with no open record means no ENTRY preceded it;
    /// that is warned about and skipped, never raised.
    async fn on_exit(&self, event: &ProductionEvent) -> TrackingResult<()> {
        let Some(mut metric) = self
            .store
            .time_metric(event.work_order_id, event.department_id)
            .await?
        else {
            tracing::warn!(
                "EXIT for work order {} in department {} has no time record; skipping",
                event.work_order_id,
                event.department_id
            );
            return Ok(());
        };

        if metric.is_complete {
            // The automatic EXIT appended by a transfer lands here after
            // the operator's EXIT already closed the visit.
            tracing::debug!(
                "Time record for work order {} in department {} already complete",
                event.work_order_id,
                event.department_id
            );
            return Ok(());
        }

        metric.complete(event.timestamp);
        let advancement = metric.advancement_minutes.unwrap_or(0);
        let working = metric.working_minutes.unwrap_or(0);
        let waiting = metric.waiting_minutes;
        self.store.upsert_time_metric(metric).await?;

        let Some(work_order) = self.store.work_order(event.work_order_id).await? else {
            tracing::warn!(
                "Work order {} vanished before its part statistic update",
                event.work_order_id
            );
            return Ok(());
        };

        let mut statistic = self
            .store
            .part_statistic(work_order.part_id, event.department_id)
            .await?
            .unwrap_or_else(|| {
                PartTimeStatistic::empty(work_order.part_id, event.department_id)
            });
        statistic.record_completion(advancement, working, waiting);
        self.store.upsert_part_statistic(statistic).await
    }

    /// RESUME: close the immediately preceding PAUSE in this department
    /// and add its duration to the visit's accumulated pause time.
    async fn on_resume(&self, event: &ProductionEvent) -> TrackingResult<()> {
        let history = self.store.events_for_work_order(event.work_order_id).await?;
        let in_department: Vec<&ProductionEvent> = history
            .iter()
            .filter(|e| e.department_id == event.department_id && e.id != event.id)
            .collect();

        let last_pause = in_department
            .iter()
            .filter(|e| e.event_type == EventType::Pause && e.timestamp <= event.timestamp)
            .max_by_key(|e| e.timestamp);
        let last_resume = in_department
            .iter()
            .filter(|e| e.event_type == EventType::Resume && e.timestamp <= event.timestamp)
            .max_by_key(|e| e.timestamp);

        let Some(pause) = last_pause else {
            tracing::warn!(
                "RESUME for work order {} in department {} has no matching PAUSE; skipping",
                event.work_order_id,
                event.department_id
            );
            return Ok(());
        };
        if let Some(resume) = last_resume {
            if resume.timestamp >= pause.timestamp {
                tracing::warn!(
                    "RESUME for work order {} in department {} repeats a closed pause; skipping",
                    event.work_order_id,
                    event.department_id
                );
                return Ok(());
            }
        }

        let Some(mut metric) = self
            .store
            .time_metric(event.work_order_id, event.department_id)
            .await?
        else {
            tracing::warn!(
                "RESUME for work order {} in department {} has no time record; skipping",
                event.work_order_id,
                event.department_id
            );
            return Ok(());
        };

        metric.add_pause_minutes(event.timestamp.minutes_since(pause.timestamp));
        self.store.upsert_time_metric(metric).await
    }
}

#[cfg(test)]
#[path = "tests/metrics_tests.rs"]
mod tests;
