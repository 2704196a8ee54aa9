//! Unit tests for the in-memory store's transactional guarantees.

use crate::clock::Clock;
use crate::domain::{
    DepartmentType, EventType, ProductionEvent, TrackingError, WorkOrderStatus,
};
use crate::store::{EventStore, StatusUpdate, WorkOrderStore};
use crate::testutil::Plant;

/// A manual event for the given work order and department type.
fn event_in(plant: &Plant, work_order: &crate::domain::WorkOrder, department_type: DepartmentType, event_type: EventType) -> ProductionEvent {
    ProductionEvent::manual(
        work_order.id,
        plant.department_id(department_type),
        event_type,
        plant.operator.id,
        plant.clock.now(),
    )
}

#[tokio::test]
async fn append_with_status_commits_event_and_version_bump() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-0001", WorkOrderStatus::Created)
        .await;

    let event = event_in(&plant, &work_order, DepartmentType::Cleanroom, EventType::Entry);
    let updated = plant
        .store
        .append_with_status(
            event,
            Some(StatusUpdate {
                work_order_id: work_order.id,
                new_status: WorkOrderStatus::In(DepartmentType::Cleanroom),
                expected_version: 0,
            }),
        )
        .await
        .expect("commit");

    assert_eq!(updated.status, WorkOrderStatus::In(DepartmentType::Cleanroom));
    assert_eq!(updated.version, 1);
    let events = plant
        .store
        .events_for_work_order(work_order.id)
        .await
        .expect("events");
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn stale_version_conflicts_and_commits_nothing() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-0002", WorkOrderStatus::Created)
        .await;

    let event = event_in(&plant, &work_order, DepartmentType::Cleanroom, EventType::Entry);
    let result = plant
        .store
        .append_with_status(
            event,
            Some(StatusUpdate {
                work_order_id: work_order.id,
                new_status: WorkOrderStatus::In(DepartmentType::Cleanroom),
                expected_version: 7,
            }),
        )
        .await;

    assert!(matches!(
        result,
        Err(TrackingError::ConcurrencyConflict { .. })
    ));
    let stored = plant
        .store
        .work_order(work_order.id)
        .await
        .expect("query")
        .expect("present");
    assert_eq!(stored.status, WorkOrderStatus::Created);
    assert_eq!(stored.version, 0);
    assert!(plant
        .store
        .events_for_work_order(work_order.id)
        .await
        .expect("events")
        .is_empty());
}

#[tokio::test]
async fn append_without_update_leaves_status_alone() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-0003", WorkOrderStatus::In(DepartmentType::Autoclave))
        .await;

    let event = event_in(&plant, &work_order, DepartmentType::Autoclave, EventType::Pause);
    let updated = plant
        .store
        .append_with_status(event, None)
        .await
        .expect("commit");

    assert_eq!(updated.status, WorkOrderStatus::In(DepartmentType::Autoclave));
    assert_eq!(updated.version, 0);
}

#[tokio::test]
async fn append_transfer_commits_status_and_both_events() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order(
            "ODL-0004",
            WorkOrderStatus::DepartmentCompleted(DepartmentType::Cleanroom),
        )
        .await;

    let exit = ProductionEvent::automatic(
        work_order.id,
        plant.department_id(DepartmentType::Cleanroom),
        EventType::Exit,
        plant.operator.id,
        plant.clock.now(),
    );
    let entry = ProductionEvent::automatic(
        work_order.id,
        plant.department_id(DepartmentType::Autoclave),
        EventType::Entry,
        plant.operator.id,
        plant.clock.now(),
    );

    let updated = plant
        .store
        .append_transfer(
            StatusUpdate {
                work_order_id: work_order.id,
                new_status: WorkOrderStatus::In(DepartmentType::Autoclave),
                expected_version: 0,
            },
            exit,
            Some(entry),
        )
        .await
        .expect("transfer");

    assert_eq!(updated.status, WorkOrderStatus::In(DepartmentType::Autoclave));
    assert_eq!(updated.version, 1);
    let events = plant
        .store
        .events_for_work_order(work_order.id)
        .await
        .expect("events");
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.is_automatic));
}

#[tokio::test]
async fn conflicted_transfer_appends_no_events() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order(
            "ODL-0005",
            WorkOrderStatus::DepartmentCompleted(DepartmentType::Cleanroom),
        )
        .await;

    let exit = ProductionEvent::automatic(
        work_order.id,
        plant.department_id(DepartmentType::Cleanroom),
        EventType::Exit,
        plant.operator.id,
        plant.clock.now(),
    );

    let result = plant
        .store
        .append_transfer(
            StatusUpdate {
                work_order_id: work_order.id,
                new_status: WorkOrderStatus::In(DepartmentType::Autoclave),
                expected_version: 3,
            },
            exit,
            None,
        )
        .await;

    assert!(matches!(
        result,
        Err(TrackingError::ConcurrencyConflict { .. })
    ));
    assert!(plant
        .store
        .events_for_work_order(work_order.id)
        .await
        .expect("events")
        .is_empty());
}

#[tokio::test]
async fn events_are_returned_in_timestamp_order() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-0006", WorkOrderStatus::In(DepartmentType::Cleanroom))
        .await;

    let later = event_in(&plant, &work_order, DepartmentType::Cleanroom, EventType::Pause);
    plant.clock.advance_minutes(-30);
    let earlier = event_in(&plant, &work_order, DepartmentType::Cleanroom, EventType::Entry);

    plant
        .store
        .append_with_status(later, None)
        .await
        .expect("commit");
    plant
        .store
        .append_with_status(earlier.clone(), None)
        .await
        .expect("commit");

    let events = plant
        .store
        .events_for_work_order(work_order.id)
        .await
        .expect("events");
    assert_eq!(events[0].id, earlier.id);
}

#[tokio::test]
async fn curing_batch_attachments_are_visible_until_released() {
    use crate::store::CuringBatchStore;

    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-0007", WorkOrderStatus::In(DepartmentType::Autoclave))
        .await;

    plant.store.attach_curing_batch(work_order.id, "BATCH-12").await;
    assert_eq!(
        plant
            .store
            .active_curing_batch(work_order.id)
            .await
            .expect("query"),
        Some("BATCH-12".to_string())
    );

    plant.store.release_curing_batch(work_order.id).await;
    assert_eq!(
        plant
            .store
            .active_curing_batch(work_order.id)
            .await
            .expect("query"),
        None
    );
}

#[tokio::test]
async fn recover_statuses_rebuilds_the_cached_projection() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-0008", WorkOrderStatus::Created)
        .await;

    // History: entered and exited cleanroom, transfer pair into autoclave.
    for (department_type, event_type, automatic) in [
        (DepartmentType::Cleanroom, EventType::Entry, false),
        (DepartmentType::Cleanroom, EventType::Exit, false),
        (DepartmentType::Cleanroom, EventType::Exit, true),
        (DepartmentType::Autoclave, EventType::Entry, true),
    ] {
        plant.clock.advance_minutes(5);
        let event = if automatic {
            ProductionEvent::automatic(
                work_order.id,
                plant.department_id(department_type),
                event_type,
                plant.operator.id,
                plant.clock.now(),
            )
        } else {
            ProductionEvent::manual(
                work_order.id,
                plant.department_id(department_type),
                event_type,
                plant.operator.id,
                plant.clock.now(),
            )
        };
        plant
            .store
            .append_with_status(event, None)
            .await
            .expect("commit");
    }

    plant.store.recover_statuses().await;

    let recovered = plant
        .store
        .work_order(work_order.id)
        .await
        .expect("query")
        .expect("present");
    assert_eq!(
        recovered.status,
        WorkOrderStatus::In(DepartmentType::Autoclave)
    );
}
