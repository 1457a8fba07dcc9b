//! Status classifier tests.

use taxsim_core::{
    config::SynthesisConfig,
    reference::ReferenceTables,
    rng::{RngBank, StreamSlot},
    status_classifier::StatusClassifier,
    types::{Gender, Status},
};

#[test]
fn under_thirteen_is_always_student() {
    let config = SynthesisConfig::default();
    let reference = ReferenceTables::default_test();
    let classifier = StatusClassifier::new(&config, &reference);
    let mut rng = RngBank::new(3).for_stream(StreamSlot::Status);

    for age in 0..13 {
        assert_eq!(classifier.classify(age, Gender::Male, 0.0, &mut rng), Status::Student);
    }
}

#[test]
fn retirement_probability_ramps_to_certainty_at_sixty_seven() {
    let config = SynthesisConfig::default();
    let reference = ReferenceTables::default_test();
    let classifier = StatusClassifier::new(&config, &reference);

    assert_eq!(classifier.retirement_probability(59), 0.0);
    assert_eq!(classifier.retirement_probability(60), 0.125);
    assert_eq!(classifier.retirement_probability(63), 0.5);
    assert_eq!(classifier.retirement_probability(67), 1.0);
    assert_eq!(classifier.retirement_probability(90), 1.0);

    let mut rng = RngBank::new(5).for_stream(StreamSlot::Status);
    for _ in 0..500 {
        assert_eq!(
            classifier.classify(67, Gender::Female, 9_000_000.0, &mut rng),
            Status::Retired
        );
    }
}

#[test]
fn employment_probability_is_dampened_by_low_income() {
    let config = SynthesisConfig::default();
    let reference = ReferenceTables::default_test();
    let classifier = StatusClassifier::new(&config, &reference);

    assert!((classifier.employment_probability(30, Gender::Male, 5_000_000.0) - 0.85).abs() < 1e-12);
    assert!((classifier.employment_probability(30, Gender::Male, 50_000.0) - 0.425).abs() < 1e-12);
    assert_eq!(classifier.employment_probability(30, Gender::Male, 0.0), 0.0);
}

#[test]
fn missing_employment_row_defaults_to_half() {
    let config = SynthesisConfig::default();
    let mut reference = ReferenceTables::default_test();
    reference.employment.clear();
    let classifier = StatusClassifier::new(&config, &reference);

    assert_eq!(classifier.employment_probability(30, Gender::Female, 1_000_000.0), 0.5);
}

#[test]
fn zero_income_adults_are_never_employed() {
    let config = SynthesisConfig::default();
    let reference = ReferenceTables::default_test();
    let classifier = StatusClassifier::new(&config, &reference);
    let mut rng = RngBank::new(8).for_stream(StreamSlot::Status);

    for _ in 0..500 {
        let status = classifier.classify(35, Gender::Male, 0.0, &mut rng);
        assert!(matches!(status, Status::Student | Status::Disabled), "got {status}");
    }
}

#[test]
fn student_probability_decays_to_its_floor() {
    let config = SynthesisConfig::default();
    let reference = ReferenceTables::default_test();
    let classifier = StatusClassifier::new(&config, &reference);

    assert_eq!(classifier.student_probability(13), 1.0);
    assert!(classifier.student_probability(30) < classifier.student_probability(20));
    assert_eq!(classifier.student_probability(60), 0.05);
    assert_eq!(classifier.student_probability(75), 0.05);
}

#[test]
fn working_age_high_earners_are_mostly_employed() {
    let config = SynthesisConfig::default();
    let reference = ReferenceTables::default_test();
    let classifier = StatusClassifier::new(&config, &reference);
    let mut rng = RngBank::new(21).for_stream(StreamSlot::Status);

    let employed = (0..4_000)
        .filter(|_| classifier.classify(40, Gender::Female, 8_000_000.0, &mut rng) == Status::Employed)
        .count();
    let share = employed as f64 / 4_000.0;
    assert!((0.80..0.90).contains(&share), "employed share {share:.3}, expected ≈0.85");
}
