//! Unit tests for event ingestion, the derived status cache, and the
//! tracking status query.

use crate::domain::{
    replay, DepartmentId, DepartmentType, EventType, TrackingError, UserAccount, UserId,
    WorkOrderId, WorkOrderStatus, MAIN_SEQUENCE,
};
use crate::store::{EventStore, WorkOrderStore};
use crate::testutil::Plant;
use crate::tracking::NewEventRequest;

/// Request for a manual event in the given department type.
fn request(
    plant: &Plant,
    work_order_id: WorkOrderId,
    department_type: DepartmentType,
    event_type: EventType,
) -> NewEventRequest {
    NewEventRequest {
        work_order_id,
        department_id: plant.department_id(department_type),
        event_type,
        user_id: plant.operator.id,
        notes: None,
        duration_ms: None,
    }
}

/// Asserts the §8 consistency invariant: the cached status equals the
/// replay of the full event history.
async fn assert_replay_matches(plant: &Plant, work_order_id: WorkOrderId) {
    let work_order = plant
        .store
        .work_order(work_order_id)
        .await
        .expect("query")
        .expect("present");
    let events = plant
        .store
        .events_for_work_order(work_order_id)
        .await
        .expect("events");
    let folded = replay(events.iter().map(|e| {
        let department_type = plant
            .departments
            .values()
            .find(|d| d.id == e.department_id)
            .expect("known department")
            .department_type;
        (department_type, e.event_type, e.is_automatic)
    }));
    assert_eq!(folded, work_order.status, "cached status must equal replay");
}

// ============================================================================
// Validation and errors
// ============================================================================

#[tokio::test]
async fn unknown_references_are_not_found() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2001", WorkOrderStatus::Created)
        .await;

    let missing_work_order = plant
        .tracking
        .create_production_event(request(
            &plant,
            WorkOrderId::new(),
            DepartmentType::Cleanroom,
            EventType::Entry,
        ))
        .await;
    assert!(matches!(
        missing_work_order,
        Err(TrackingError::NotFound { entity: "work order", .. })
    ));

    let mut missing_department = request(
        &plant,
        work_order.id,
        DepartmentType::Cleanroom,
        EventType::Entry,
    );
    missing_department.department_id = DepartmentId::new();
    assert!(matches!(
        plant
            .tracking
            .create_production_event(missing_department)
            .await,
        Err(TrackingError::NotFound { entity: "department", .. })
    ));

    let mut missing_user = request(
        &plant,
        work_order.id,
        DepartmentType::Cleanroom,
        EventType::Entry,
    );
    missing_user.user_id = UserId::new();
    assert!(matches!(
        plant.tracking.create_production_event(missing_user).await,
        Err(TrackingError::NotFound { entity: "user", .. })
    ));
}

#[tokio::test]
async fn deactivated_users_cannot_record_events() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2002", WorkOrderStatus::Created)
        .await;

    let mut dormant = UserAccount::new("l.verdi");
    dormant.is_active = false;
    plant.store.insert_user(dormant.clone()).await;

    let mut req = request(
        &plant,
        work_order.id,
        DepartmentType::Cleanroom,
        EventType::Entry,
    );
    req.user_id = dormant.id;
    assert!(matches!(
        plant.tracking.create_production_event(req).await,
        Err(TrackingError::InactiveUser { .. })
    ));
}

#[tokio::test]
async fn entry_into_the_wrong_department_is_an_illegal_transition() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2003", WorkOrderStatus::Created)
        .await;

    let result = plant
        .tracking
        .create_production_event(request(
            &plant,
            work_order.id,
            DepartmentType::Autoclave,
            EventType::Entry,
        ))
        .await;

    match result {
        Err(TrackingError::IllegalTransition { expected, .. }) => {
            assert!(expected.contains("ASSIGNED_TO_AUTOCLAVE"));
            assert!(expected.contains("CLEANROOM_COMPLETED"));
        }
        other => panic!("expected illegal transition, got {:?}", other),
    }
}

#[tokio::test]
async fn exit_without_an_open_entry_is_rejected() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2004", WorkOrderStatus::Created)
        .await;

    let result = plant
        .tracking
        .create_production_event(request(
            &plant,
            work_order.id,
            DepartmentType::Cleanroom,
            EventType::Exit,
        ))
        .await;

    match result {
        Err(TrackingError::IllegalTransition { expected, .. }) => {
            assert_eq!(expected, "IN_CLEANROOM");
        }
        other => panic!("expected illegal transition, got {:?}", other),
    }
}

// ============================================================================
// Ingestion and the derived status
// ============================================================================

#[tokio::test]
async fn entry_moves_a_created_order_into_the_cleanroom() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2005", WorkOrderStatus::Created)
        .await;

    let recorded = plant
        .tracking
        .create_production_event(request(
            &plant,
            work_order.id,
            DepartmentType::Cleanroom,
            EventType::Entry,
        ))
        .await
        .expect("record");

    assert_eq!(
        recorded.work_order.status,
        WorkOrderStatus::In(DepartmentType::Cleanroom)
    );
    assert!(!recorded.event.is_automatic);
    assert!(recorded.auto_transfer.is_none());
    assert_replay_matches(&plant, work_order.id).await;
}

#[tokio::test]
async fn exit_triggers_the_automatic_transfer_and_annotates_the_response() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2006", WorkOrderStatus::Created)
        .await;

    plant
        .tracking
        .create_production_event(request(
            &plant,
            work_order.id,
            DepartmentType::Cleanroom,
            EventType::Entry,
        ))
        .await
        .expect("entry");
    plant.clock.advance_minutes(45);

    let recorded = plant
        .tracking
        .create_production_event(request(
            &plant,
            work_order.id,
            DepartmentType::Cleanroom,
            EventType::Exit,
        ))
        .await
        .expect("exit");

    let transfer = recorded.auto_transfer.expect("transfer annotation");
    assert!(transfer.success);
    assert_eq!(
        transfer.next_department.as_ref().map(|d| d.department_type),
        Some(DepartmentType::Autoclave)
    );
    assert_eq!(
        recorded.work_order.status,
        WorkOrderStatus::In(DepartmentType::Autoclave)
    );

    // Manual ENTRY + manual EXIT + automatic EXIT/ENTRY pair.
    let events = plant
        .store
        .events_for_work_order(work_order.id)
        .await
        .expect("events");
    assert_eq!(events.len(), 4);
    assert_eq!(
        events.iter().filter(|e| e.is_automatic).count(),
        2,
        "the transfer pair is flagged automatic"
    );
    assert_replay_matches(&plant, work_order.id).await;
}

#[tokio::test]
async fn a_blocked_transfer_degrades_to_an_annotation() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2007", WorkOrderStatus::In(DepartmentType::Autoclave))
        .await;
    plant
        .store
        .attach_curing_batch(work_order.id, "BATCH-3")
        .await;

    let recorded = plant
        .tracking
        .create_production_event(request(
            &plant,
            work_order.id,
            DepartmentType::Autoclave,
            EventType::Exit,
        ))
        .await
        .expect("the exit itself must succeed");

    let transfer = recorded.auto_transfer.expect("annotation");
    assert!(!transfer.success);
    assert!(transfer.message.contains("curing batch"));
    assert!(!transfer.required_actions.is_empty());
    // The order stays put, ready for a manual transfer once unloaded.
    assert_eq!(
        recorded.work_order.status,
        WorkOrderStatus::DepartmentCompleted(DepartmentType::Autoclave)
    );
    assert_replay_matches(&plant, work_order.id).await;
}

#[tokio::test]
async fn pauses_and_resumes_never_move_the_status() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2008", WorkOrderStatus::Created)
        .await;

    plant
        .tracking
        .create_production_event(request(
            &plant,
            work_order.id,
            DepartmentType::Cleanroom,
            EventType::Entry,
        ))
        .await
        .expect("entry");

    for event_type in [EventType::Pause, EventType::Resume, EventType::Note] {
        plant.clock.advance_minutes(10);
        let recorded = plant
            .tracking
            .create_production_event(request(
                &plant,
                work_order.id,
                DepartmentType::Cleanroom,
                event_type,
            ))
            .await
            .expect("record");
        assert_eq!(
            recorded.work_order.status,
            WorkOrderStatus::In(DepartmentType::Cleanroom)
        );
    }
    assert_replay_matches(&plant, work_order.id).await;
}

#[tokio::test]
async fn a_work_order_walks_the_whole_sequence_to_completion() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2009", WorkOrderStatus::Created)
        .await;

    for department_type in MAIN_SEQUENCE {
        // The transfer already produced the ENTRY for every station after
        // the first.
        if department_type == DepartmentType::Cleanroom {
            plant
                .tracking
                .create_production_event(request(
                    &plant,
                    work_order.id,
                    department_type,
                    EventType::Entry,
                ))
                .await
                .expect("entry");
        }
        plant.clock.advance_minutes(60);
        plant
            .tracking
            .create_production_event(request(
                &plant,
                work_order.id,
                department_type,
                EventType::Exit,
            ))
            .await
            .expect("exit");
    }

    let finished = plant
        .store
        .work_order(work_order.id)
        .await
        .expect("query")
        .expect("present");
    assert_eq!(finished.status, WorkOrderStatus::Completed);
    assert_replay_matches(&plant, work_order.id).await;
}

// ============================================================================
// Assignment
// ============================================================================

#[tokio::test]
async fn assignment_is_only_legal_from_created() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2010", WorkOrderStatus::Created)
        .await;

    let recorded = plant
        .tracking
        .create_assignment_event(
            work_order.id,
            plant.department_id(DepartmentType::Cleanroom),
            plant.operator.id,
            Some("first shift".to_string()),
        )
        .await
        .expect("assign");
    assert_eq!(
        recorded.work_order.status,
        WorkOrderStatus::AssignedTo(DepartmentType::Cleanroom)
    );
    assert_eq!(recorded.event.event_type, EventType::Assigned);

    let again = plant
        .tracking
        .create_assignment_event(
            work_order.id,
            plant.department_id(DepartmentType::Cleanroom),
            plant.operator.id,
            None,
        )
        .await;
    assert!(matches!(
        again,
        Err(TrackingError::IllegalTransition { .. })
    ));
}

// ============================================================================
// Tracking status query
// ============================================================================

#[tokio::test]
async fn tracking_status_reports_the_open_visit() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2011", WorkOrderStatus::Created)
        .await;

    plant
        .tracking
        .create_production_event(request(
            &plant,
            work_order.id,
            DepartmentType::Cleanroom,
            EventType::Entry,
        ))
        .await
        .expect("entry");
    plant.clock.advance_minutes(30);
    plant
        .tracking
        .create_production_event(request(
            &plant,
            work_order.id,
            DepartmentType::Cleanroom,
            EventType::Pause,
        ))
        .await
        .expect("pause");
    plant.clock.advance_minutes(10);

    let status = plant
        .tracking
        .get_work_order_tracking_status(work_order.id)
        .await
        .expect("status");

    assert_eq!(status.status, WorkOrderStatus::In(DepartmentType::Cleanroom));
    assert_eq!(
        status.current_department.as_ref().map(|d| d.department_type),
        Some(DepartmentType::Cleanroom)
    );
    assert_eq!(status.minutes_in_current_department, Some(40));
    assert_eq!(status.total_production_minutes, 40);
    assert!(status.is_paused);
    assert_eq!(
        status.last_event.as_ref().map(|e| e.event_type),
        Some(EventType::Pause)
    );
}

#[tokio::test]
async fn tracking_status_sums_closed_visits() {
    let plant = Plant::new().await;
    let work_order = plant
        .register_work_order("ODL-2012", WorkOrderStatus::Created)
        .await;

    plant
        .tracking
        .create_production_event(request(
            &plant,
            work_order.id,
            DepartmentType::Cleanroom,
            EventType::Entry,
        ))
        .await
        .expect("entry");
    plant.clock.advance_minutes(90);
    plant
        .tracking
        .create_production_event(request(
            &plant,
            work_order.id,
            DepartmentType::Cleanroom,
            EventType::Exit,
        ))
        .await
        .expect("exit");
    plant.clock.advance_minutes(25);

    let status = plant
        .tracking
        .get_work_order_tracking_status(work_order.id)
        .await
        .expect("status");

    // 90 in the cleanroom, plus 25 and counting inside the autoclave the
    // transfer moved it into.
    assert_eq!(status.status, WorkOrderStatus::In(DepartmentType::Autoclave));
    assert_eq!(status.minutes_in_current_department, Some(25));
    assert_eq!(status.total_production_minutes, 115);
    assert!(!status.is_paused);
}
