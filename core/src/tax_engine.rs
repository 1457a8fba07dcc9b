//! Tax engine: per-individual liabilities under the configured schedule.
//!
//! Every function here is pure. Aggregates are a single fold over the
//! per-individual results; nothing is shared between individuals.

use crate::{
    config::{TaxBracket, TaxConfig},
    synthesizer::Individual,
    types::{Age, Isk},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct TaxResult {
    /// State tax from the brackets, before the personal credit.
    pub state_tax: Isk,
    /// Net income tax after the credit, including the municipal share.
    pub income_tax: Isk,
    /// Municipal share of `income_tax`.
    pub municipal_tax: Isk,
    pub capital_gains_tax: Isk,
    pub broadcasting_fee: Isk,
    pub elderly_fund_fee: Isk,
    pub fixed_fees: Isk,
    pub total_tax: Isk,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxedIndividual {
    pub individual: Individual,
    pub tax: TaxResult,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct TaxTotals {
    pub individuals: usize,
    pub state_tax: Isk,
    pub income_tax: Isk,
    pub municipal_tax: Isk,
    pub capital_gains_tax: Isk,
    pub broadcasting_fee: Isk,
    pub elderly_fund_fee: Isk,
    pub fixed_fees: Isk,
    pub total_tax: Isk,
}

impl TaxTotals {
    pub fn add(&mut self, t: &TaxResult) {
        self.individuals += 1;
        self.state_tax += t.state_tax;
        self.income_tax += t.income_tax;
        self.municipal_tax += t.municipal_tax;
        self.capital_gains_tax += t.capital_gains_tax;
        self.broadcasting_fee += t.broadcasting_fee;
        self.elderly_fund_fee += t.elderly_fund_fee;
        self.fixed_fees += t.fixed_fees;
        self.total_tax += t.total_tax;
    }
}

/// Progressive tax: each band taxes only the slice of income between
/// the previous band's ceiling and its own.
pub fn bracket_tax(income: Isk, brackets: &[TaxBracket]) -> Isk {
    let mut tax = 0.0;
    let mut lower = 0.0;
    for bracket in brackets {
        if income <= lower {
            break;
        }
        let upper = bracket.upper_bound.unwrap_or(f64::INFINITY);
        tax += (income.min(upper) - lower) * bracket.rate;
        lower = upper;
    }
    tax
}

/// (state tax, net income tax, net municipal tax) for an adult.
///
/// The credit is set against state + municipal tax together, and the
/// municipal share of what remains is proportional to its share of the
/// gross.
pub fn adult_income_tax(total_income: Isk, municipal_rate: f64, config: &TaxConfig) -> (Isk, Isk, Isk) {
    let state_tax = bracket_tax(total_income, &config.brackets);
    let municipal_gross = total_income * municipal_rate;
    let gross = state_tax + municipal_gross;
    let net = (gross - config.personal_tax_credit).max(0.0);
    let net_municipal = if gross > 0.0 && net > 0.0 {
        municipal_gross * (net / gross)
    } else {
        0.0
    };
    (state_tax, net, net_municipal)
}

pub fn child_income_tax(total_income: Isk, config: &TaxConfig) -> Isk {
    (total_income - config.child_exempt_amount).max(0.0) * config.child_tax_rate
}

pub fn capital_gains_tax(capital_gains: Isk, config: &TaxConfig) -> Isk {
    (capital_gains - config.capital_gains_exempt_threshold).max(0.0) * config.capital_gains_rate
}

/// (broadcasting fee, elderly fund fee)
pub fn fixed_fees(age: Age, config: &TaxConfig) -> (Isk, Isk) {
    if age >= config.fee_age {
        (config.radio_fee, config.elderly_fund_fee)
    } else {
        (0.0, 0.0)
    }
}

pub fn compute_tax(person: &Individual, municipal_rate: f64, config: &TaxConfig) -> TaxResult {
    let (state_tax, income_tax, municipal_tax) = if person.age < config.child_age_limit {
        (0.0, child_income_tax(person.total_income, config), 0.0)
    } else {
        adult_income_tax(person.total_income, municipal_rate, config)
    };
    let cg_tax = capital_gains_tax(person.capital_gains, config);
    let (broadcasting_fee, elderly_fund_fee) = fixed_fees(person.age, config);
    let fees = broadcasting_fee + elderly_fund_fee;

    TaxResult {
        state_tax,
        income_tax,
        municipal_tax,
        capital_gains_tax: cg_tax,
        broadcasting_fee,
        elderly_fund_fee,
        fixed_fees: fees,
        total_tax: income_tax + cg_tax + fees,
    }
}

/// Tax the whole population. Income fields are never modified.
pub fn tax_population(
    population: Vec<Individual>,
    municipal_rate: f64,
    config: &TaxConfig,
) -> (Vec<TaxedIndividual>, TaxTotals) {
    let mut totals = TaxTotals::default();
    let taxed: Vec<TaxedIndividual> = population
        .into_iter()
        .map(|individual| {
            let tax = compute_tax(&individual, municipal_rate, config);
            totals.add(&tax);
            TaxedIndividual { individual, tax }
        })
        .collect();

    log::info!(
        "tax: individuals={} income_tax={:.0} municipal={:.0} capital_gains={:.0} fees={:.0}",
        totals.individuals,
        totals.income_tax,
        totals.municipal_tax,
        totals.capital_gains_tax,
        totals.fixed_fees
    );
    (taxed, totals)
}
