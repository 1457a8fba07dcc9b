//! Population synthesis: one record per resident.
//!
//! EXECUTION ORDER per individual (fixed):
//!   1. Gender     (uniform)
//!   2. Income     (IncomeSampler)
//!   3. Status     (StatusClassifier)
//!   4. Occupation (OccupationAssigner, Employed only)
//!
//! Cohorts are processed in ascending age order and every cohort yields
//! exactly `count` individuals. The tail adjustment runs once afterwards.

use crate::{
    config::SimConfig,
    error::SimResult,
    income_sampler::{IncomeDraw, IncomeSampler},
    occupation::OccupationAssigner,
    reference::{IncomeRow, ReferenceTables},
    rng::{RngBank, StreamRng, StreamSlot},
    status_classifier::StatusClassifier,
    tail_adjustment::{apply_tail_adjustment, TailSummary},
    types::{Age, Gender, Isk, Status},
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Individual {
    pub person_id: u64,
    pub age: Age,
    pub gender: Gender,
    pub status: Status,
    /// Occupation code when employed, otherwise the status label.
    pub occupation: String,
    pub wages: Isk,
    pub capital_gains: Isk,
    pub other_income: Isk,
    pub total_income: Isk,
}

impl Individual {
    pub fn new(
        person_id: u64,
        age: Age,
        gender: Gender,
        status: Status,
        occupation: Option<String>,
        income: IncomeDraw,
    ) -> Self {
        let occupation = match status {
            Status::Employed => occupation.unwrap_or_else(|| status.as_str().to_string()),
            _ => status.as_str().to_string(),
        };
        Self {
            person_id,
            age,
            gender,
            status,
            occupation,
            wages: income.wages,
            capital_gains: income.capital_gains,
            other_income: income.other_income,
            total_income: income.wages + income.capital_gains + income.other_income,
        }
    }

    /// Copy with new capital gains and a recomputed total.
    pub fn with_capital_gains(self, capital_gains: Isk) -> Self {
        Self {
            capital_gains,
            total_income: self.wages + capital_gains + self.other_income,
            ..self
        }
    }

    pub fn income_is_consistent(&self) -> bool {
        self.total_income == self.wages + self.capital_gains + self.other_income
    }
}

/// One isolated stream per family of draws.
pub struct SynthesisRngs {
    pub gender:     StreamRng,
    pub income:     StreamRng,
    pub status:     StreamRng,
    pub occupation: StreamRng,
}

impl SynthesisRngs {
    pub fn from_bank(bank: &RngBank) -> Self {
        Self {
            gender:     bank.for_stream(StreamSlot::Gender),
            income:     bank.for_stream(StreamSlot::Income),
            status:     bank.for_stream(StreamSlot::Status),
            occupation: bank.for_stream(StreamSlot::Occupation),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub population: Vec<Individual>,
    pub tail: TailSummary,
}

pub struct PopulationSynthesizer<'a> {
    config:       &'a SimConfig,
    reference:    &'a ReferenceTables,
    income_table: Cow<'a, BTreeMap<(Age, Gender), IncomeRow>>,
    occupations:  OccupationAssigner,
}

impl<'a> PopulationSynthesizer<'a> {
    pub fn new(config: &'a SimConfig, reference: &'a ReferenceTables) -> SimResult<Self> {
        config.synthesis.validate()?;
        let income_table = reference.income_for_sampling(config.synthesis.smoothing_window);
        Ok(Self {
            config,
            reference,
            income_table,
            occupations: OccupationAssigner::new(&config.occupations)?,
        })
    }

    /// Build one individual of the given age.
    pub fn synthesize_individual(
        &self,
        person_id: u64,
        age: Age,
        rngs: &mut SynthesisRngs,
    ) -> SimResult<Individual> {
        let gender = if rngs.gender.chance(0.5) { Gender::Male } else { Gender::Female };

        let sampler = IncomeSampler::new(&self.config.synthesis, &self.income_table);
        let income = sampler.sample(age, gender, &mut rngs.income)?;

        let classifier = StatusClassifier::new(&self.config.synthesis, self.reference);
        let status = classifier.classify(age, gender, income.total_income, &mut rngs.status);

        let occupation = match status {
            Status::Employed => Some(self.occupations.assign(gender, &mut rngs.occupation)?),
            _ => None,
        };

        Ok(Individual::new(person_id, age, gender, status, occupation, income))
    }

    /// Every cohort, before the tail adjustment.
    pub fn synthesize(&self, rngs: &mut SynthesisRngs) -> SimResult<Vec<Individual>> {
        let total = self.reference.total_population();
        let mut population = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
        let mut next_id = 0u64;

        for (&age, &count) in &self.reference.population_by_age {
            if count == 0 {
                log::warn!("synthesis: age {age} has an empty cohort");
                continue;
            }
            for _ in 0..count {
                population.push(self.synthesize_individual(next_id, age, rngs)?);
                next_id += 1;
            }
            log::debug!("synthesis: age={age} created {count}");
        }

        log::info!("synthesis: created {} individuals", population.len());
        Ok(population)
    }

    /// Full synthesis: all cohorts, then the tail adjustment.
    pub fn run(&self, bank: &RngBank) -> SimResult<SynthesisOutcome> {
        let mut rngs = SynthesisRngs::from_bank(bank);
        let population = self.synthesize(&mut rngs)?;
        let (population, tail) = apply_tail_adjustment(population, &self.config.synthesis);
        Ok(SynthesisOutcome { population, tail })
    }
}
