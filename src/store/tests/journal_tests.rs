//! Unit tests for the JSONL event journal.

use crate::domain::{DepartmentId, EventType, ProductionEvent, TimestampUtc, UserId, WorkOrderId};
use crate::store::{EventJournal, EventStore, MemoryStore, StatusUpdate, WorkOrderStore};
use std::io::Write;

fn sample_event(event_type: EventType) -> ProductionEvent {
    ProductionEvent::manual(
        WorkOrderId::new(),
        DepartmentId::new(),
        event_type,
        UserId::new(),
        TimestampUtc::now(),
    )
}

#[test]
fn append_then_load_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let journal = EventJournal::new(dir.path().join("events.jsonl"));

    let events = vec![
        sample_event(EventType::Entry).with_notes("ply 1 of 4"),
        sample_event(EventType::Exit),
    ];
    journal.append_all(&events).expect("append");

    let loaded = journal.load().expect("load");
    assert_eq!(loaded, events);
}

#[test]
fn missing_journal_loads_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let journal = EventJournal::new(dir.path().join("absent.jsonl"));
    assert!(journal.load().expect("load").is_empty());
}

#[test]
fn appends_accumulate_across_batches() {
    let dir = tempfile::tempdir().expect("tempdir");
    let journal = EventJournal::new(dir.path().join("events.jsonl"));

    journal
        .append_all(&[sample_event(EventType::Entry)])
        .expect("first");
    journal
        .append_all(&[sample_event(EventType::Pause), sample_event(EventType::Resume)])
        .expect("second");

    assert_eq!(journal.load().expect("load").len(), 3);
}

#[test]
fn unparseable_lines_are_skipped_on_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    let journal = EventJournal::new(path.clone());
    journal
        .append_all(&[sample_event(EventType::Entry)])
        .expect("append");

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .expect("open");
    writeln!(file, "{{not json").expect("corrupt line");
    drop(file);

    journal
        .append_all(&[sample_event(EventType::Exit)])
        .expect("append after corruption");

    assert_eq!(journal.load().expect("load").len(), 2);
}

#[tokio::test]
async fn journal_backed_store_replays_history_on_startup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");

    let work_order_id = WorkOrderId::new();
    let department_id = DepartmentId::new();
    let user_id = UserId::new();
    let event = ProductionEvent::manual(
        work_order_id,
        department_id,
        EventType::Entry,
        user_id,
        TimestampUtc::now(),
    );
    EventJournal::new(path.clone())
        .append_all(std::slice::from_ref(&event))
        .expect("seed journal");

    let store = MemoryStore::with_journal(EventJournal::new(path)).expect("open store");
    let history = store
        .events_for_work_order(work_order_id)
        .await
        .expect("events");
    assert_eq!(history, vec![event]);
}

#[tokio::test]
async fn committed_events_reach_the_journal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    let store =
        MemoryStore::with_journal(EventJournal::new(path.clone())).expect("open store");

    let work_order = crate::domain::WorkOrder::new(
        "ODL-J-001",
        crate::domain::PartId::new(),
        1,
        crate::domain::Priority::Normal,
        TimestampUtc::now(),
    );
    store
        .insert_work_order(work_order.clone())
        .await
        .expect("insert");

    let event = ProductionEvent::manual(
        work_order.id,
        DepartmentId::new(),
        EventType::Note,
        UserId::new(),
        TimestampUtc::now(),
    );
    store
        .append_with_status(event.clone(), None)
        .await
        .expect("commit");

    // A conflicted write must leave no trace in the journal.
    let conflicted = ProductionEvent::manual(
        work_order.id,
        DepartmentId::new(),
        EventType::Note,
        UserId::new(),
        TimestampUtc::now(),
    );
    let result = store
        .append_with_status(
            conflicted,
            Some(StatusUpdate {
                work_order_id: work_order.id,
                new_status: crate::domain::WorkOrderStatus::OnHold,
                expected_version: 9,
            }),
        )
        .await;
    assert!(result.is_err());

    let replayed = EventJournal::new(path).load().expect("load");
    assert_eq!(replayed, vec![event]);
}
