//! Reference table smoothing.

use std::borrow::Cow;
use taxsim_core::{
    config::{SimConfig, SynthesisConfig},
    reference::{IncomeRow, ReferenceTables},
    rng::RngBank,
    synthesizer::PopulationSynthesizer,
    types::{Age, Gender},
};

fn row(value: f64) -> IncomeRow {
    IncomeRow { wages: value, capital_gains: 0.0, other_income: 0.0, total: value }
}

/// Male wages 1, 2, 3, 4, 5 over ages 13..=17.
fn ramp() -> ReferenceTables {
    let mut tables = ReferenceTables::default();
    for (i, age) in (13..=17).enumerate() {
        tables.income.insert((age, Gender::Male), row(i as f64 + 1.0));
    }
    tables
}

fn male_wages(table: &std::collections::BTreeMap<(Age, Gender), IncomeRow>) -> Vec<f64> {
    (13..=17).map(|age| table[&(age, Gender::Male)].wages).collect()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
    }
}

#[test]
fn window_of_five_averages_partial_edges() {
    let smoothed = ramp().smoothed_income(5);
    assert_close(&male_wages(&smoothed), &[2.0, 2.5, 3.0, 3.5, 4.0]);
}

#[test]
fn even_window_leans_towards_younger_ages() {
    // Age i averages positions i-2 ..= i+1.
    let smoothed = ramp().smoothed_income(4);
    assert_close(&male_wages(&smoothed), &[1.5, 2.0, 2.5, 3.5, 4.0]);
}

#[test]
fn smoothing_keeps_genders_apart() {
    let mut tables = ramp();
    tables.income.insert((15, Gender::Female), row(100.0));
    let smoothed = tables.smoothed_income(5);
    assert_eq!(smoothed[&(15, Gender::Female)].wages, 100.0);
    assert_close(&male_wages(&smoothed), &[2.0, 2.5, 3.0, 3.5, 4.0]);
}

#[test]
fn window_wider_than_the_table_averages_everything() {
    let smoothed = ramp().smoothed_income(usize::MAX);
    assert_close(&male_wages(&smoothed), &[3.0; 5]);
}

#[test]
fn no_window_samples_from_the_raw_table() {
    let tables = ramp();
    for window in [None, Some(1)] {
        let table = tables.income_for_sampling(window);
        assert!(matches!(table, Cow::Borrowed(_)), "window {window:?}");
        assert_eq!(*table, tables.income);
    }
    let smoothed = tables.income_for_sampling(Some(5));
    assert!(matches!(smoothed, Cow::Owned(_)));
    assert_close(&male_wages(&smoothed), &[2.0, 2.5, 3.0, 3.5, 4.0]);
}

#[test]
fn oversized_smoothing_window_is_rejected_before_synthesis() {
    let synthesis = SynthesisConfig { smoothing_window: Some(usize::MAX), ..SynthesisConfig::default() };
    assert!(synthesis.validate().is_err());

    let mut config = SimConfig::default_test();
    config.synthesis = synthesis;
    let reference = ReferenceTables::default_test();
    assert!(PopulationSynthesizer::new(&config, &reference).is_err());

    let widest = SynthesisConfig { smoothing_window: Some(110), ..SynthesisConfig::default() };
    assert!(widest.validate().is_ok());
    let zero = SynthesisConfig { smoothing_window: Some(0), ..SynthesisConfig::default() };
    assert!(zero.validate().is_err());
}

#[test]
fn unsmoothed_config_still_synthesises() {
    let mut config = SimConfig::default_test();
    config.synthesis.smoothing_window = None;
    let reference = ReferenceTables::default_test();
    let outcome = PopulationSynthesizer::new(&config, &reference)
        .unwrap()
        .run(&RngBank::new(8))
        .unwrap();
    assert_eq!(outcome.population.len() as u64, reference.total_population());
}
