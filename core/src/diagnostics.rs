//! Fit diagnostics: synthesised cohort means against the reference.
//!
//! This module is READ-ONLY. It never touches the population and holds
//! no state, so the same population always yields the same report.

use crate::{
    reference::{IncomeRow, ReferenceTables},
    synthesizer::Individual,
    types::{Age, Gender},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Worst offenders reported per gender.
pub const WORST_GROUPS_PER_GENDER: usize = 5;

/// Left-closed age bins used for the bias breakdown; the last edge is open.
pub const AGE_BIN_EDGES: [Age; 10] = [0, 20, 30, 40, 50, 60, 70, 80, 90, 120];

/// The four income metrics, used for means and for errors alike.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Metrics {
    pub total: f64,
    pub wages: f64,
    pub capital_gains: f64,
    pub other_income: f64,
}

impl Metrics {
    fn abs(&self) -> Self {
        Self {
            total:         self.total.abs(),
            wages:         self.wages.abs(),
            capital_gains: self.capital_gains.abs(),
            other_income:  self.other_income.abs(),
        }
    }

    fn add(&mut self, other: &Self) {
        self.total += other.total;
        self.wages += other.wages;
        self.capital_gains += other.capital_gains;
        self.other_income += other.other_income;
    }

    fn divided(&self, n: usize) -> Self {
        if n == 0 {
            return Self::default();
        }
        let n = n as f64;
        Self {
            total:         self.total / n,
            wages:         self.wages / n,
            capital_gains: self.capital_gains / n,
            other_income:  self.other_income / n,
        }
    }
}

/// One (age, gender) group after the outer join.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupFit {
    pub age: Age,
    pub gender: Gender,
    /// Synthesised individuals in the group; 0 when only the reference has it.
    pub individuals: usize,
    pub synthesized: Metrics,
    pub reference: Metrics,
    /// Signed error, synthesised minus reference.
    pub error: Metrics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorstGroup {
    pub age: Age,
    pub total_error: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgeBinBias {
    pub age_from: Age,
    pub age_to: Age,
    pub groups: usize,
    pub mean_error: Metrics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FitReport {
    pub groups: Vec<GroupFit>,
    pub mean_absolute_error: Metrics,
    pub worst_by_gender: BTreeMap<Gender, Vec<WorstGroup>>,
    pub bias_by_age_bin: Vec<AgeBinBias>,
}

fn as_metrics(row: &IncomeRow) -> Metrics {
    Metrics {
        total:         row.total,
        wages:         row.wages,
        capital_gains: row.capital_gains,
        other_income:  row.other_income,
    }
}

fn synthesized_means(population: &[Individual]) -> BTreeMap<(Age, Gender), (usize, Metrics)> {
    let mut sums: BTreeMap<(Age, Gender), (usize, Metrics)> = BTreeMap::new();
    for p in population {
        let entry = sums.entry((p.age, p.gender)).or_default();
        entry.0 += 1;
        entry.1.add(&Metrics {
            total:         p.total_income,
            wages:         p.wages,
            capital_gains: p.capital_gains,
            other_income:  p.other_income,
        });
    }
    sums.into_iter()
        .map(|(key, (n, sum))| (key, (n, sum.divided(n))))
        .collect()
}

/// Compare the population against the (unsmoothed) reference income table.
pub fn evaluate_fit(population: &[Individual], reference: &ReferenceTables) -> FitReport {
    let synthesized = synthesized_means(population);

    let keys: BTreeSet<(Age, Gender)> = synthesized
        .keys()
        .chain(reference.income.keys())
        .copied()
        .collect();

    let groups: Vec<GroupFit> = keys
        .into_iter()
        .map(|(age, gender)| {
            let (individuals, synth) = synthesized
                .get(&(age, gender))
                .copied()
                .unwrap_or_default();
            let refm = reference
                .income_row(age, gender)
                .map(as_metrics)
                .unwrap_or_default();
            GroupFit {
                age,
                gender,
                individuals,
                synthesized: synth,
                reference: refm,
                error: Metrics {
                    total:         synth.total - refm.total,
                    wages:         synth.wages - refm.wages,
                    capital_gains: synth.capital_gains - refm.capital_gains,
                    other_income:  synth.other_income - refm.other_income,
                },
            }
        })
        .collect();

    let mut abs_sum = Metrics::default();
    for g in &groups {
        abs_sum.add(&g.error.abs());
    }
    let mean_absolute_error = abs_sum.divided(groups.len());

    let mut worst_by_gender = BTreeMap::new();
    for gender in Gender::ALL {
        let mut ranked: Vec<&GroupFit> = groups.iter().filter(|g| g.gender == gender).collect();
        // Stable sort keeps ascending age among equal errors.
        ranked.sort_by(|a, b| b.error.total.abs().total_cmp(&a.error.total.abs()));
        worst_by_gender.insert(
            gender,
            ranked
                .into_iter()
                .take(WORST_GROUPS_PER_GENDER)
                .map(|g| WorstGroup { age: g.age, total_error: g.error.total })
                .collect(),
        );
    }

    let bias_by_age_bin = AGE_BIN_EDGES
        .windows(2)
        .filter_map(|edge| {
            let (from, to) = (edge[0], edge[1]);
            let in_bin: Vec<&GroupFit> =
                groups.iter().filter(|g| g.age >= from && g.age < to).collect();
            if in_bin.is_empty() {
                return None;
            }
            let mut sum = Metrics::default();
            for g in &in_bin {
                sum.add(&g.error);
            }
            Some(AgeBinBias {
                age_from: from,
                age_to: to,
                groups: in_bin.len(),
                mean_error: sum.divided(in_bin.len()),
            })
        })
        .collect();

    log::info!(
        "diagnostics: groups={} mae_total={:.0} mae_wages={:.0} mae_cg={:.0} mae_other={:.0}",
        groups.len(),
        mean_absolute_error.total,
        mean_absolute_error.wages,
        mean_absolute_error.capital_gains,
        mean_absolute_error.other_income
    );

    FitReport {
        groups,
        mean_absolute_error,
        worst_by_gender,
        bias_by_age_bin,
    }
}
