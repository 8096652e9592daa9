//! SQLite run ledger.

use relocation_core::{
    event::{EventLogEntry, EventOutcome},
    store::SimStore,
};

fn store_with_run(run_id: &str) -> SimStore {
    let store = SimStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_run(run_id, 99, "test", 2010).unwrap();
    store
}

fn entry(run_id: &str, year: u32, sequence: u64, outcome: EventOutcome) -> EventLogEntry {
    EventLogEntry {
        id:         None,
        run_id:     run_id.to_string(),
        year,
        sequence,
        event_type: "relocation".to_string(),
        subject:    sequence as u32,
        outcome:    outcome.name().to_string(),
        payload:    serde_json::to_string(&outcome).unwrap(),
    }
}

#[test]
fn run_seed_is_recorded() {
    let store = store_with_run("r1");
    assert_eq!(store.run_seed("r1").unwrap(), Some(99));
    assert_eq!(store.run_seed("missing").unwrap(), None);
}

#[test]
fn ledger_reads_back_in_sequence_order() {
    let store = store_with_run("r1");
    store.append_event(&entry("r1", 2010, 1, EventOutcome::Stayed)).unwrap();
    store.append_event(&entry("r1", 2010, 0, EventOutcome::Moved { from: Some(3), to: 7 })).unwrap();
    store.append_event(&entry("r1", 2011, 0, EventOutcome::NoOutcome)).unwrap();

    let year = store.events_for_year("r1", 2010).unwrap();
    assert_eq!(year.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(year[0].outcome, "moved");
    let payload: EventOutcome = serde_json::from_str(&year[0].payload).unwrap();
    assert_eq!(payload, EventOutcome::Moved { from: Some(3), to: 7 });

    assert_eq!(store.event_count("r1").unwrap(), 3);
}

#[test]
fn rolled_back_batch_leaves_no_rows() {
    let store = store_with_run("r1");
    store.begin_batch().unwrap();
    store.append_event(&entry("r1", 2010, 0, EventOutcome::Stayed)).unwrap();
    store.rollback_batch();

    assert_eq!(store.event_count("r1").unwrap(), 0);
    // Nothing open: a second rollback is a no-op.
    store.rollback_batch();
}
