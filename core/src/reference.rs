//! Reference tables: published aggregates used as sampling anchors.
//!
//! RULE: reference tables are loaded once per run and never mutated.
//! Smoothing produces a new table; the raw table is kept for diagnostics.

use crate::{
    error::{SimError, SimResult},
    types::{Age, Gender, INCOME_START_AGE, MAX_AGE},
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Mean annual income components for one (age, gender) cohort.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IncomeRow {
    pub wages: f64,
    pub capital_gains: f64,
    pub other_income: f64,
    pub total: f64,
}

impl IncomeRow {
    fn divided(&self, n: f64) -> Self {
        Self {
            wages:         self.wages / n,
            capital_gains: self.capital_gains / n,
            other_income:  self.other_income / n,
            total:         self.total / n,
        }
    }

    fn add(&self, other: &Self) -> Self {
        Self {
            wages:         self.wages + other.wages,
            capital_gains: self.capital_gains + other.capital_gains,
            other_income:  self.other_income + other.other_income,
            total:         self.total + other.total,
        }
    }

    const ZERO: Self = Self { wages: 0.0, capital_gains: 0.0, other_income: 0.0, total: 0.0 };
}

// File shapes: flat row lists, one record per cohort.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationCount {
    pub age: Age,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub age: Age,
    pub gender: Gender,
    #[serde(flatten)]
    pub income: IncomeRow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmploymentRecord {
    pub age: Age,
    pub gender: Gender,
    /// Share employed, in [0, 1].
    pub rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub population_by_age: BTreeMap<Age, u64>,
    pub income: BTreeMap<(Age, Gender), IncomeRow>,
    pub employment: BTreeMap<(Age, Gender), f64>,
}

impl ReferenceTables {
    pub fn from_records(
        population: Vec<PopulationCount>,
        income: Vec<IncomeRecord>,
        employment: Vec<EmploymentRecord>,
    ) -> SimResult<Self> {
        let mut tables = Self::default();
        for p in population {
            if p.age > MAX_AGE {
                return Err(SimError::InvalidReference(format!(
                    "population age {} above supported maximum {MAX_AGE}",
                    p.age
                )));
            }
            *tables.population_by_age.entry(p.age).or_insert(0) += p.count;
        }
        for r in income {
            if tables.income.insert((r.age, r.gender), r.income).is_some() {
                return Err(SimError::InvalidReference(format!(
                    "duplicate income row for age {}, {}",
                    r.age, r.gender
                )));
            }
        }
        for e in employment {
            if !(0.0..=1.0).contains(&e.rate) {
                return Err(SimError::InvalidReference(format!(
                    "employment rate {} for age {}, {} outside [0, 1]",
                    e.rate, e.age, e.gender
                )));
            }
            tables.employment.insert((e.age, e.gender), e.rate);
        }
        Ok(tables)
    }

    /// Load the three tables from `{data_dir}/reference/*.json`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let population: Vec<PopulationCount> =
            read_json(&format!("{data_dir}/reference/population_by_age.json"))?;
        let income: Vec<IncomeRecord> =
            read_json(&format!("{data_dir}/reference/income_by_age_gender.json"))?;
        let employment: Vec<EmploymentRecord> =
            read_json(&format!("{data_dir}/reference/employment_by_age_gender.json"))?;
        let tables = Self::from_records(population, income, employment)?;
        tables.check_income_coverage()?;
        Ok(tables)
    }

    pub fn income_row(&self, age: Age, gender: Gender) -> Option<&IncomeRow> {
        self.income.get(&(age, gender))
    }

    pub fn employment_rate(&self, age: Age, gender: Gender) -> Option<f64> {
        self.employment.get(&(age, gender)).copied()
    }

    pub fn total_population(&self) -> u64 {
        self.population_by_age.values().sum()
    }

    /// Every populated age at or above INCOME_START_AGE must have an
    /// income row for both genders.
    pub fn check_income_coverage(&self) -> SimResult<()> {
        for (&age, &count) in &self.population_by_age {
            if age < INCOME_START_AGE || count == 0 {
                continue;
            }
            for gender in Gender::ALL {
                if self.income_row(age, gender).is_none() {
                    return Err(SimError::MissingReference { age, gender });
                }
            }
        }
        Ok(())
    }

    /// Income table smoothed with a centred moving average over adjacent
    /// ages, per gender. Edge windows average whatever rows exist.
    pub fn smoothed_income(&self, window: usize) -> BTreeMap<(Age, Gender), IncomeRow> {
        let window = window.max(1);
        let half = window / 2;
        let mut out = BTreeMap::new();
        for gender in Gender::ALL {
            let rows: Vec<(Age, IncomeRow)> = self
                .income
                .iter()
                .filter(|((_, g), _)| *g == gender)
                .map(|((age, _), row)| (*age, *row))
                .collect();
            // Centring for even windows follows the trailing-heavy
            // convention: positions [i - half, i + window - half - 1].
            for i in 0..rows.len() {
                let lo = i.saturating_sub(half);
                let hi = i.saturating_add(window - half).min(rows.len());
                let slice = &rows[lo..hi];
                let sum = slice.iter().fold(IncomeRow::ZERO, |acc, (_, r)| acc.add(r));
                out.insert((rows[i].0, gender), sum.divided(slice.len() as f64));
            }
        }
        out
    }

    /// The income table to sample from: smoothed when a window wider
    /// than one is configured, otherwise the raw table.
    pub fn income_for_sampling(
        &self,
        window: Option<usize>,
    ) -> Cow<'_, BTreeMap<(Age, Gender), IncomeRow>> {
        match window {
            Some(window) if window > 1 => Cow::Owned(self.smoothed_income(window)),
            _ => Cow::Borrowed(&self.income),
        }
    }

    /// Small synthetic tables for tests: every age 0..=MAX_AGE populated,
    /// a hump-shaped wage curve peaking in the late forties and pension
    /// income after sixty-seven.
    pub fn default_test() -> Self {
        let mut tables = Self::default();
        for age in 0..=MAX_AGE {
            tables.population_by_age.insert(age, 20);
            if age < INCOME_START_AGE {
                continue;
            }
            let a = f64::from(age);
            for gender in Gender::ALL {
                let gender_factor = match gender {
                    Gender::Male   => 1.0,
                    Gender::Female => 0.82,
                };
                let wages = (9_000_000.0 - 4_000.0 * (a - 48.0).powi(2)).max(250_000.0)
                    * gender_factor;
                let capital_gains = 40_000.0 * a;
                let other_income = if age >= 67 { 4_200_000.0 } else { 600_000.0 };
                tables.income.insert(
                    (age, gender),
                    IncomeRow {
                        wages,
                        capital_gains,
                        other_income,
                        total: wages + capital_gains + other_income,
                    },
                );
                let rate = if (20..=66).contains(&age) { 0.85 } else { 0.35 };
                tables.employment.insert((age, gender), rate);
            }
        }
        tables
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}
