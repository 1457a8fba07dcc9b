//! Income sampling for a single individual.
//!
//! Each component is the cohort mean scaled by its own noise factor
//! drawn from N(1, σ) and clipped to the configured band, then rounded
//! to whole krónur. Ages at the top of the observed range get a gentle
//! taper so the curve does not drop off a cliff.

use crate::{
    config::SynthesisConfig,
    error::{SimError, SimResult},
    reference::IncomeRow,
    rng::StreamRng,
    types::{round_isk, Age, Gender, Isk, INCOME_START_AGE},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct IncomeDraw {
    pub wages: Isk,
    pub capital_gains: Isk,
    pub other_income: Isk,
    pub total_income: Isk,
}

impl IncomeDraw {
    pub const ZERO: Self = Self {
        wages:         0.0,
        capital_gains: 0.0,
        other_income:  0.0,
        total_income:  0.0,
    };

    fn from_components(wages: Isk, capital_gains: Isk, other_income: Isk) -> Self {
        Self {
            wages,
            capital_gains,
            other_income,
            total_income: round_isk(wages + capital_gains + other_income),
        }
    }
}

/// Multiplier applied from `taper_start_age` onwards.
pub fn taper_factor(age: Age, config: &SynthesisConfig) -> f64 {
    if age < config.taper_start_age {
        return 1.0;
    }
    let years = f64::from(age - config.taper_start_age);
    (1.0 - years * config.taper_per_year).max(config.taper_floor)
}

pub struct IncomeSampler<'a> {
    config: &'a SynthesisConfig,
    table:  &'a BTreeMap<(Age, Gender), IncomeRow>,
}

impl<'a> IncomeSampler<'a> {
    pub fn new(config: &'a SynthesisConfig, table: &'a BTreeMap<(Age, Gender), IncomeRow>) -> Self {
        Self { config, table }
    }

    /// Draw one individual's income. Ages below INCOME_START_AGE
    /// return zero without consuming any randomness.
    pub fn sample(&self, age: Age, gender: Gender, rng: &mut StreamRng) -> SimResult<IncomeDraw> {
        if age < INCOME_START_AGE {
            return Ok(IncomeDraw::ZERO);
        }
        let row = self
            .table
            .get(&(age, gender))
            .ok_or(SimError::MissingReference { age, gender })?;

        let std_dev = if age >= self.config.high_age_threshold {
            self.config.high_age_noise_std_dev
        } else {
            self.config.noise_std_dev
        };

        let mut noisy = |mean: f64| -> SimResult<Isk> {
            let factor = rng.clipped_normal(
                1.0,
                std_dev,
                self.config.noise_clip_low,
                self.config.noise_clip_high,
            )?;
            Ok(round_isk(mean * factor))
        };
        let wages = noisy(row.wages)?;
        let capital_gains = noisy(row.capital_gains)?;
        let other_income = noisy(row.other_income)?;

        let taper = taper_factor(age, self.config);
        Ok(IncomeDraw::from_components(
            round_isk(wages * taper),
            round_isk(capital_gains * taper),
            round_isk(other_income * taper),
        ))
    }
}
