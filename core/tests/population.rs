//! End-to-end pipeline tests over the small synthetic tables.

use taxsim_core::{
    config::{MunicipalRateSource, SimConfig, DEFAULT_MUNICIPAL_TAX_RATE},
    engine::SimEngine,
    event::SimEvent,
    reference::ReferenceTables,
    rng::RngBank,
    synthesizer::{Individual, PopulationSynthesizer},
    types::{Status, INCOME_START_AGE},
};

fn run(run_id: &str, seed: u64) -> (SimEngine, taxsim_core::engine::RunOutcome) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = SimEngine::build_test(run_id.into(), seed).unwrap();
    let outcome = engine.run().unwrap();
    (engine, outcome)
}

#[test]
fn population_size_matches_the_distribution() {
    let (engine, outcome) = run("pop-size", 11);
    let expected = engine.reference().total_population();
    assert_eq!(outcome.population.len() as u64, expected);
    assert_eq!(outcome.summary.individuals as u64, expected);
    assert_eq!(engine.store.population_count("pop-size").unwrap() as u64, expected);

    for (&age, &count) in &engine.reference().population_by_age {
        let cohort = outcome
            .population
            .iter()
            .filter(|t| t.individual.age == age)
            .count() as u64;
        assert_eq!(cohort, count, "cohort size for age {age}");
    }
}

#[test]
fn person_ids_are_unique_and_dense() {
    let (_, outcome) = run("pop-ids", 12);
    let mut ids: Vec<u64> = outcome.population.iter().map(|t| t.individual.person_id).collect();
    ids.sort_unstable();
    let expected: Vec<u64> = (0..ids.len() as u64).collect();
    assert_eq!(ids, expected);
}

#[test]
fn total_income_is_always_the_sum_of_components() {
    let (_, outcome) = run("pop-income", 13);
    for t in &outcome.population {
        assert!(
            t.individual.income_is_consistent(),
            "person {} total {} != components",
            t.individual.person_id,
            t.individual.total_income
        );
    }
}

#[test]
fn children_have_no_income_and_are_students() {
    let (_, outcome) = run("pop-children", 14);
    let children: Vec<_> = outcome
        .population
        .iter()
        .map(|t| &t.individual)
        .filter(|p| p.age < INCOME_START_AGE)
        .collect();
    assert!(!children.is_empty());
    for p in children {
        assert_eq!(p.total_income, 0.0);
        assert_eq!(p.status, Status::Student);
        assert_eq!(p.occupation, "Student");
    }
}

#[test]
fn occupation_is_the_status_label_unless_employed() {
    let (engine, outcome) = run("pop-occupation", 15);
    let known = &engine.config().occupations;
    for t in &outcome.population {
        let p = &t.individual;
        if p.status == Status::Employed {
            let codes = &known.by_gender[&p.gender];
            assert!(
                codes.iter().any(|w| w.occupation == p.occupation),
                "unknown occupation {}",
                p.occupation
            );
        } else {
            assert_eq!(p.occupation, p.status.as_str());
        }
    }
    assert!(outcome.summary.status_count(Status::Employed) > 0);
    assert!(outcome.summary.status_count(Status::Retired) > 0);
}

#[test]
fn everyone_past_sixty_seven_is_retired() {
    let (_, outcome) = run("pop-retired", 16);
    for t in outcome.population.iter().filter(|t| t.individual.age >= 67) {
        assert_eq!(t.individual.status, Status::Retired, "age {}", t.individual.age);
    }
}

#[test]
fn missing_municipal_rate_records_a_fallback_warning() {
    let (engine, outcome) = run("pop-fallback", 17);
    assert_eq!(outcome.municipal_rate.source, MunicipalRateSource::Fallback);
    assert_eq!(outcome.municipal_rate.rate, DEFAULT_MUNICIPAL_TAX_RATE);
    assert!(outcome.events.iter().any(SimEvent::is_warning));
    assert_eq!(
        engine.store.event_count("pop-fallback", "municipal_rate_fallback").unwrap(),
        1
    );
}

#[test]
fn configured_municipal_rate_is_used_silently() {
    let mut config = SimConfig::default_test();
    config.tax.municipal_tax_rate = Some(0.145);
    let mut engine = SimEngine::build_test_with(
        "pop-configured".into(),
        18,
        config,
        ReferenceTables::default_test(),
    )
    .unwrap();
    let outcome = engine.run().unwrap();

    assert_eq!(outcome.municipal_rate.source, MunicipalRateSource::Configured);
    assert!(!outcome.events.iter().any(SimEvent::is_warning));
    assert_eq!(
        engine.store.event_count("pop-configured", "municipal_rate_fallback").unwrap(),
        0
    );
    assert!(outcome.events.iter().any(|e| matches!(
        e,
        SimEvent::TaxesComputed { municipal_rate, .. } if *municipal_rate == 0.145
    )));
}

#[test]
fn every_stage_is_logged_in_order() {
    let (engine, _) = run("pop-events", 19);
    let types: Vec<String> = engine
        .store_events()
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        types,
        vec![
            "run_initialized",
            "population_synthesized",
            "tail_adjusted",
            "fit_diagnosed",
            "municipal_rate_fallback",
            "taxes_computed",
        ]
    );
}

#[test]
fn persisted_taxes_match_the_in_memory_totals() {
    let (engine, outcome) = run("pop-taxes", 20);
    let stored = engine.store.tax_totals("pop-taxes").unwrap();
    assert_eq!(stored.individuals, outcome.totals.individuals);
    let close = |a: f64, b: f64| (a - b).abs() <= 1e-6 * b.abs().max(1.0);
    assert!(close(stored.total_tax, outcome.totals.total_tax));
    assert!(close(stored.income_tax, outcome.totals.income_tax));
    assert!(close(stored.capital_gains_tax, outcome.totals.capital_gains_tax));
    assert_eq!(
        engine.store.fit_group_count("pop-taxes").unwrap() as usize,
        outcome.fit.groups.len()
    );
}

#[test]
fn summary_breaks_taxes_down_by_age() {
    let (_, outcome) = run("pop-summary", 21);
    let by_age_income: f64 = outcome.summary.tax_by_age.values().map(|s| s.income_tax).sum();
    let relative = (by_age_income - outcome.totals.income_tax).abs()
        / outcome.totals.income_tax.abs().max(1.0);
    assert!(relative < 1e-9);

    let occupations: usize = outcome.summary.occupation_counts.iter().map(|(_, n)| n).sum();
    assert_eq!(occupations, outcome.summary.individuals);
    for pair in outcome.summary.occupation_counts.windows(2) {
        assert!(pair[0].1 >= pair[1].1, "occupation counts not descending");
    }
}

#[test]
fn engine_population_matches_a_standalone_synthesis() {
    let (engine, outcome) = run("pop-standalone", 22);
    let synthesizer = PopulationSynthesizer::new(engine.config(), engine.reference()).unwrap();
    let standalone = synthesizer.run(&RngBank::new(22)).unwrap();

    let from_engine: Vec<Individual> =
        outcome.population.into_iter().map(|t| t.individual).collect();
    assert_eq!(from_engine, standalone.population);
    assert_eq!(outcome.tail, standalone.tail);
}

#[test]
fn run_initialised_event_carries_the_master_seed() {
    let (engine, outcome) = run("pop-seed", 0xABCD);
    assert_eq!(engine.rng_bank.master_seed(), 0xABCD);
    assert_eq!(
        outcome.events[0],
        SimEvent::RunInitialized { run_id: "pop-seed".into(), seed: 0xABCD }
    );
}
