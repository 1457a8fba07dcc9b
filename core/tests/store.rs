//! Persistence tests.

use taxsim_core::{
    engine::SimEngine,
    event::{EventLogEntry, SimEvent},
    reference::ReferenceTables,
    store::SimStore,
};

fn store() -> SimStore {
    let store = SimStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

#[test]
fn migration_is_idempotent() {
    let store = store();
    store.migrate().unwrap();
}

#[test]
fn run_seed_round_trips_through_the_run_table() {
    let store = store();
    store.insert_run("seeded", u64::MAX - 7, "0.1.0-test", 1_700_000_000).unwrap();
    assert_eq!(store.run_seed("seeded").unwrap(), Some(u64::MAX - 7));
    assert_eq!(store.run_seed("missing").unwrap(), None);
}

#[test]
fn reference_tables_reload_unchanged() {
    let store = store();
    let tables = ReferenceTables::default_test();
    store.save_reference_tables(&tables).unwrap();

    let loaded = store.load_reference_tables().unwrap();
    assert_eq!(loaded.population_by_age, tables.population_by_age);
    assert_eq!(loaded.income, tables.income);
    assert_eq!(loaded.employment, tables.employment);

    // Saving again replaces rather than duplicates.
    store.save_reference_tables(&tables).unwrap();
    let reloaded = store.load_reference_tables().unwrap();
    assert_eq!(reloaded.total_population(), tables.total_population());
}

#[test]
fn events_come_back_in_sequence_order() {
    let store = store();
    store.insert_run("ev", 1, "0.1.0-test", 0).unwrap();
    for (seq, event) in [
        (1, SimEvent::MunicipalRateFallback { rate: 0.1494 }),
        (0, SimEvent::RunInitialized { run_id: "ev".into(), seed: 1 }),
    ] {
        store
            .append_event(&EventLogEntry {
                id:         None,
                run_id:     "ev".into(),
                seq,
                stage:      "engine".into(),
                event_type: event.type_name().into(),
                payload:    serde_json::to_string(&event).unwrap(),
            })
            .unwrap();
    }

    let entries = store.events_for_run("ev").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].event_type, "run_initialized");
    let first: SimEvent = serde_json::from_str(&entries[0].payload).unwrap();
    assert_eq!(first, SimEvent::RunInitialized { run_id: "ev".into(), seed: 1 });
    assert_eq!(store.event_count("ev", "municipal_rate_fallback").unwrap(), 1);
}

#[test]
fn engine_runs_from_stored_reference_tables() {
    let scratch = store();
    scratch.save_reference_tables(&ReferenceTables::default_test()).unwrap();
    let reference = scratch.load_reference_tables().unwrap();

    let mut engine = SimEngine::build_test_with(
        "from-store".into(),
        5,
        taxsim_core::config::SimConfig::default_test(),
        reference,
    )
    .unwrap();
    let outcome = engine.run().unwrap();
    assert_eq!(
        outcome.population.len() as u64,
        ReferenceTables::default_test().total_population()
    );
}
