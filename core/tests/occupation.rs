//! Occupation assigner tests.

use std::collections::BTreeMap;
use taxsim_core::{
    config::default_occupation_weights,
    occupation::{OccupationAssigner, OccupationWeight, OccupationWeights},
    rng::{RngBank, StreamSlot},
    types::Gender,
};

#[test]
fn probabilities_sum_to_one_per_gender() {
    let weights = default_occupation_weights();
    for gender in Gender::ALL {
        let total: f64 = weights.probabilities(gender).iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-12, "{gender}: {total}");
    }
}

#[test]
fn draws_follow_the_headcounts() {
    let weights = default_occupation_weights();
    let assigner = OccupationAssigner::new(&weights).unwrap();
    let mut rng = RngBank::new(17).for_stream(StreamSlot::Occupation);

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let n = 20_000;
    for _ in 0..n {
        *counts.entry(assigner.assign(Gender::Female, &mut rng).unwrap()).or_insert(0) += 1;
    }

    for (label, p) in weights.probabilities(Gender::Female) {
        let observed = *counts.get(&label).unwrap_or(&0) as f64 / n as f64;
        assert!(
            (observed - p).abs() < 0.015,
            "{label}: observed {observed:.3}, expected {p:.3}"
        );
    }
    assert_eq!(counts.len(), 7);
}

#[test]
fn zero_weight_occupations_are_never_drawn() {
    let mut by_gender = BTreeMap::new();
    for gender in Gender::ALL {
        by_gender.insert(
            gender,
            vec![
                OccupationWeight { occupation: "Fishers".into(), headcount: 10.0 },
                OccupationWeight { occupation: "Astronauts".into(), headcount: 0.0 },
            ],
        );
    }
    let assigner = OccupationAssigner::new(&OccupationWeights { by_gender }).unwrap();
    let mut rng = RngBank::new(2).for_stream(StreamSlot::Occupation);
    for _ in 0..200 {
        assert_eq!(assigner.assign(Gender::Male, &mut rng).unwrap(), "Fishers");
    }
}

#[test]
fn missing_gender_or_empty_weights_are_rejected() {
    let mut by_gender = BTreeMap::new();
    by_gender.insert(
        Gender::Male,
        vec![OccupationWeight { occupation: "Managers".into(), headcount: 1.0 }],
    );
    assert!(OccupationAssigner::new(&OccupationWeights { by_gender: by_gender.clone() }).is_err());

    by_gender.insert(
        Gender::Female,
        vec![OccupationWeight { occupation: "Managers".into(), headcount: 0.0 }],
    );
    assert!(OccupationAssigner::new(&OccupationWeights { by_gender }).is_err());
}
