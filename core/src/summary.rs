//! Plain-data summaries of a finished run, for reporting collaborators.

use crate::{
    tax_engine::{TaxTotals, TaxedIndividual},
    types::{round_isk, Age, Isk, Status},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AgeTaxSums {
    pub income_tax: Isk,
    pub capital_gains_tax: Isk,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopulationSummary {
    pub individuals: usize,
    pub status_by_age: BTreeMap<Age, BTreeMap<Status, usize>>,
    /// Occupation label and headcount, largest first.
    pub occupation_counts: Vec<(String, usize)>,
    pub tax_by_age: BTreeMap<Age, AgeTaxSums>,
    /// Totals rounded to whole krónur.
    pub rounded_totals: TaxTotals,
}

impl PopulationSummary {
    pub fn from_taxed(population: &[TaxedIndividual], totals: &TaxTotals) -> Self {
        let mut status_by_age: BTreeMap<Age, BTreeMap<Status, usize>> = BTreeMap::new();
        let mut occupations: BTreeMap<&str, usize> = BTreeMap::new();
        let mut tax_by_age: BTreeMap<Age, AgeTaxSums> = BTreeMap::new();

        for t in population {
            let p = &t.individual;
            *status_by_age.entry(p.age).or_default().entry(p.status).or_insert(0) += 1;
            *occupations.entry(p.occupation.as_str()).or_insert(0) += 1;
            let sums = tax_by_age.entry(p.age).or_default();
            sums.income_tax += t.tax.income_tax;
            sums.capital_gains_tax += t.tax.capital_gains_tax;
        }

        let mut occupation_counts: Vec<(String, usize)> = occupations
            .into_iter()
            .map(|(label, n)| (label.to_string(), n))
            .collect();
        occupation_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            individuals: population.len(),
            status_by_age,
            occupation_counts,
            tax_by_age,
            rounded_totals: TaxTotals {
                individuals:       totals.individuals,
                state_tax:         round_isk(totals.state_tax),
                income_tax:        round_isk(totals.income_tax),
                municipal_tax:     round_isk(totals.municipal_tax),
                capital_gains_tax: round_isk(totals.capital_gains_tax),
                broadcasting_fee:  round_isk(totals.broadcasting_fee),
                elderly_fund_fee:  round_isk(totals.elderly_fund_fee),
                fixed_fees:        round_isk(totals.fixed_fees),
                total_tax:         round_isk(totals.total_tax),
            },
        }
    }

    pub fn status_count(&self, status: Status) -> usize {
        self.status_by_age
            .values()
            .filter_map(|by_status| by_status.get(&status))
            .sum()
    }
}
