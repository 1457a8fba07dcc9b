//! Tail adjustment: capital-gains amplification for the top earners.
//!
//! RULE: runs exactly once, after every individual has income, status
//! and occupation. The threshold is fixed before any record changes.

use crate::{
    config::SynthesisConfig,
    synthesizer::Individual,
    types::{round_isk, Age, Isk},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TailSummary {
    pub threshold: Isk,
    /// Individuals at or above the threshold.
    pub selected: usize,
    /// Selected individuals old enough to be boosted.
    pub boosted: usize,
    pub capital_gains_before: Isk,
    pub capital_gains_after: Isk,
}

/// Quantile with linear interpolation between order statistics.
/// Returns `None` for an empty sample.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Linear ramp from 0 at the boost start age to 1 at the full age.
pub fn age_scale(age: Age, config: &SynthesisConfig) -> f64 {
    let span = f64::from(config.tail_boost_full_age - config.tail_boost_start_age);
    let years = f64::from(age) - f64::from(config.tail_boost_start_age);
    (years / span).clamp(0.0, 1.0)
}

/// Boosted capital gains for one selected individual.
/// Non-positive capital gains are clamped to zero first.
pub fn boosted_capital_gains(capital_gains: Isk, age: Age, config: &SynthesisConfig) -> Isk {
    let base = capital_gains.max(0.0);
    let exponent = base.min(config.tail_capital_gains_cap) / config.tail_capital_gains_scale;
    round_isk(base * exponent.exp() * config.tail_boost_base * age_scale(age, config))
}

pub fn apply_tail_adjustment(
    population: Vec<Individual>,
    config: &SynthesisConfig,
) -> (Vec<Individual>, TailSummary) {
    let incomes: Vec<f64> = population.iter().map(|p| p.total_income).collect();
    let Some(threshold) = quantile(&incomes, config.tail_quantile) else {
        return (
            population,
            TailSummary {
                threshold:            0.0,
                selected:             0,
                boosted:              0,
                capital_gains_before: 0.0,
                capital_gains_after:  0.0,
            },
        );
    };

    let mut summary = TailSummary {
        threshold,
        selected: 0,
        boosted: 0,
        capital_gains_before: 0.0,
        capital_gains_after: 0.0,
    };

    let adjusted = population
        .into_iter()
        .map(|person| {
            if person.total_income < threshold {
                return person;
            }
            summary.selected += 1;
            if person.age < config.tail_boost_start_age {
                return person;
            }
            summary.boosted += 1;
            summary.capital_gains_before += person.capital_gains;
            let boosted = boosted_capital_gains(person.capital_gains, person.age, config);
            summary.capital_gains_after += boosted;
            person.with_capital_gains(boosted)
        })
        .collect();

    log::info!(
        "tail: threshold={threshold:.0} selected={} boosted={}",
        summary.selected,
        summary.boosted
    );
    (adjusted, summary)
}
